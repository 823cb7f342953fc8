//! Character tables for transliteration and keyboard-layout remapping

const CYRILLIC_TO_LATIN: &[(char, &str)] = &[
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('д', "d"),
    ('е', "e"),
    ('ё', "yo"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "i"),
    ('й', "y"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ъ', ""),
    ('ы', "y"),
    ('ь', ""),
    ('э', "e"),
    ('ю', "yu"),
    ('я', "ya"),
];

const LATIN_TO_CYRILLIC: &[(char, &str)] = &[
    ('a', "а"),
    ('b', "б"),
    ('c', "ц"),
    ('d', "д"),
    ('e', "е"),
    ('f', "ф"),
    ('g', "г"),
    ('h', "х"),
    ('i', "и"),
    ('j', "й"),
    ('k', "к"),
    ('l', "л"),
    ('m', "м"),
    ('n', "н"),
    ('o', "о"),
    ('p', "п"),
    ('q', "к"),
    ('r', "р"),
    ('s', "с"),
    ('t', "т"),
    ('u', "у"),
    ('v', "в"),
    ('w', "в"),
    ('x', "кс"),
    ('y', "й"),
    ('z', "з"),
];

// Same physical keys, ЙЦУКЕН vs QWERTY.
const KEYS_LATIN: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,.`QWERTYUIOP{}ASDFGHJKL:\"ZXCVBNM<>~";
const KEYS_CYRILLIC: &str = "йцукенгшщзхъфывапролджэячсмитьбюёЙЦУКЕНГШЩЗХЪФЫВАПРОЛДЖЭЯЧСМИТЬБЮЁ";

fn is_cyrillic_text(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё'))
}

/// Phonetic transliteration: Cyrillic text to Latin, anything else to Cyrillic.
/// Output is lowercase; characters without a mapping pass through.
pub fn transliterate(text: &str) -> String {
    let table = if is_cyrillic_text(text) {
        CYRILLIC_TO_LATIN
    } else {
        LATIN_TO_CYRILLIC
    };

    text.to_lowercase()
        .chars()
        .map(|c| {
            table
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| (*to).to_string())
                .unwrap_or_else(|| c.to_string())
        })
        .collect()
}

/// Reinterpret text typed with the wrong keyboard layout active
pub fn remap_keyboard_layout(text: &str) -> String {
    text.chars()
        .map(|c| {
            if let Some(pos) = KEYS_LATIN.chars().position(|k| k == c) {
                KEYS_CYRILLIC.chars().nth(pos).unwrap_or(c)
            } else if let Some(pos) = KEYS_CYRILLIC.chars().position(|k| k == c) {
                KEYS_LATIN.chars().nth(pos).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_tables_align() {
        assert_eq!(KEYS_LATIN.chars().count(), KEYS_CYRILLIC.chars().count());
    }

    #[test]
    fn transliterates_both_directions() {
        assert_eq!(transliterate("Московское метро"), "moskovskoe metro");
        assert_eq!(transliterate("metro"), "метро");
    }

    #[test]
    fn remaps_layout_both_directions() {
        assert_eq!(remap_keyboard_layout("vtnhj"), "метро");
        assert_eq!(remap_keyboard_layout("метро"), "vtnhj");
        assert_eq!(remap_keyboard_layout("1984"), "1984");
    }
}
