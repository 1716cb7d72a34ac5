use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const HANGUL_FIRST: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
// Syllables per leading consonant: 21 vowels * 28 trailing consonants
const CHOSUNG_STRIDE: u32 = 588;

const CHOSUNG: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ',
    'ㅌ', 'ㅍ', 'ㅎ',
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub text: String,
    pub revealed: BTreeSet<usize>,
}

pub fn is_syllable(c: char) -> bool {
    (HANGUL_FIRST..=HANGUL_LAST).contains(&(c as u32))
}

pub fn chosung_of(c: char) -> char {
    if !is_syllable(c) {
        return c;
    }

    let index = (c as u32 - HANGUL_FIRST) / CHOSUNG_STRIDE;
    CHOSUNG[index as usize]
}

/// Replaces every Hangul syllable with its leading consonant.
pub fn chosung(answer: &str) -> String {
    answer.chars().map(chosung_of).collect()
}

/// Reveals `count` more characters of `answer`, scanning backward from a
/// random position.
pub fn reveal(answer: &str, revealed: &BTreeSet<usize>, count: usize) -> Hint {
    let len = answer.chars().count();
    let start = if len == 0 {
        0
    } else {
        ChaCha8Rng::from_os_rng().random_range(0..len)
    };

    reveal_from(answer, revealed, count, start)
}

/// Deterministic core of [`reveal`].
///
/// Positions are visited from `start` backward, wrapping around the end.
/// Syllables are taken first; other characters only once every syllable is
/// revealed. Already revealed positions stay revealed.
pub fn reveal_from(answer: &str, revealed: &BTreeSet<usize>, count: usize, start: usize) -> Hint {
    let chars: Vec<char> = answer.chars().collect();
    let len = chars.len();
    let mut revealed: BTreeSet<usize> = revealed.iter().copied().filter(|&i| i < len).collect();

    if len > 0 {
        let start = start % len;
        let order: Vec<usize> = (0..len).map(|step| (start + len - step) % len).collect();

        let syllables = order.iter().filter(|&&i| is_syllable(chars[i]));
        let others = order.iter().filter(|&&i| !is_syllable(chars[i]));

        let mut picked = 0;
        for &position in syllables.chain(others) {
            if picked == count {
                break;
            }
            if revealed.insert(position) {
                picked += 1;
            }
        }
    }

    if revealed.len() == len {
        return Hint {
            text: answer.to_string(),
            revealed,
        };
    }

    let text = chars
        .iter()
        .enumerate()
        .map(|(i, &c)| if revealed.contains(&i) { c } else { chosung_of(c) })
        .collect();

    Hint { text, revealed }
}
