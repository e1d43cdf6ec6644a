// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login-password generation.
//!
//! Generated passwords always contain at least one character from each of
//! the four required classes; the remaining characters are drawn uniformly
//! from the union alphabet and the result is randomly permuted so the
//! class-guaranteed characters do not sit at fixed positions.

use rand::seq::SliceRandom;
use rand::Rng;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// Minimum password length accepted by the complexity policy.
pub const MIN_LENGTH: usize = 12;

/// Generates a random password of the requested length.
///
/// Lengths below [`MIN_LENGTH`] are raised to it.
pub fn generate(length: usize) -> String {
	let length = length.max(MIN_LENGTH);
	let mut rng = rand::thread_rng();

	let mut chars: Vec<u8> = Vec::with_capacity(length);
	for class in [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS] {
		chars.push(class[rng.gen_range(0..class.len())]);
	}

	let alphabet: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS].concat();
	while chars.len() < length {
		chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
	}

	chars.shuffle(&mut rng);
	String::from_utf8(chars).expect("password alphabet is ASCII")
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn test_generated_length() {
		assert_eq!(generate(12).len(), 12);
		assert_eq!(generate(20).len(), 20);
	}

	#[test]
	fn test_short_lengths_raised_to_minimum() {
		assert_eq!(generate(0).len(), MIN_LENGTH);
		assert_eq!(generate(8).len(), MIN_LENGTH);
	}

	#[test]
	fn test_contains_all_character_classes() {
		for _ in 0..100 {
			let password = generate(12);
			assert!(password.bytes().any(|b| UPPERCASE.contains(&b)));
			assert!(password.bytes().any(|b| LOWERCASE.contains(&b)));
			assert!(password.bytes().any(|b| DIGITS.contains(&b)));
			assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
		}
	}

	#[test]
	fn test_only_alphabet_characters() {
		let alphabet: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS].concat();
		let password = generate(32);
		assert!(password.bytes().all(|b| alphabet.contains(&b)));
	}

	#[test]
	fn test_successive_passwords_are_unique() {
		let mut seen = HashSet::new();
		for _ in 0..1000 {
			assert!(seen.insert(generate(12)));
		}
	}
}
