//! Random passphrase generation.

use rand::Rng;
use zeroize::Zeroizing;

const ALPHA: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const NUM: &str = "0123456789";
const SPECIAL: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Character set a generated passphrase is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Charset {
    /// Printable ASCII without space
    #[default]
    Ascii,
    /// Letters and digits
    Alnum,
    /// Letters
    Alpha,
    /// Digits
    Num,
}

impl Charset {
    pub fn alphabet(self) -> Vec<char> {
        let sets: &[&str] = match self {
            Charset::Ascii => &[ALPHA, NUM, SPECIAL],
            Charset::Alnum => &[ALPHA, NUM],
            Charset::Alpha => &[ALPHA],
            Charset::Num => &[NUM],
        };
        sets.iter().flat_map(|s| s.chars()).collect()
    }
}

/// `len` characters drawn uniformly from `charset`.
pub fn generate(len: usize, charset: Charset) -> Zeroizing<String> {
    let alphabet = charset.alphabet();
    let mut rng = rand::rng();
    let mut out = Zeroizing::new(String::with_capacity(len));
    for _ in 0..len {
        out.push(alphabet[rng.random_range(0..alphabet.len())]);
    }
    out
}
