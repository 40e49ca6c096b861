use rand::Rng;

/// Characters of generated ids. Look-alikes (`0`/`O`, `1`/`I`/`l`, ..) are
/// left out.
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTWXYZabcdefghijkmnopqrstuvwxyz";

/// A random id of `len` characters, used for document ids and join aliases.
pub fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
