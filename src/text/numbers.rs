//! Number expansion
//!
//! Converts digit runs into spoken words before synthesis. Digits may be
//! ASCII or come from any of the Indic digit blocks; a number written in
//! Devanagari digits is read the same way as its ASCII form.
//!
//! English and Hindi get full cardinal readings (Hindi with the Indian
//! grouping of hundred, thousand, lakh, crore and arab). The remaining Indic
//! languages read numbers digit by digit with native digit names.

/// First code point of each Indic digit block (zero)
const INDIC_DIGIT_ZEROS: &[u32] = &[
    0x0966, // Devanagari
    0x09E6, // Bengali
    0x0A66, // Gurmukhi
    0x0AE6, // Gujarati
    0x0B66, // Oriya
    0x0BE6, // Tamil
    0x0C66, // Telugu
    0x0CE6, // Kannada
    0x0D66, // Malayalam
];

/// Numbers longer than this are read digit by digit
const MAX_CARDINAL_DIGITS: usize = 15;

const EN_ONES: [&str; 20] = [
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
];

const EN_TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const EN_DIGITS: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// Hindi cardinals 0-99; these are irregular and cannot be composed
const HI_UNDER_HUNDRED: [&str; 100] = [
    "शून्य", "एक", "दो", "तीन", "चार", "पाँच", "छह", "सात", "आठ", "नौ",
    "दस", "ग्यारह", "बारह", "तेरह", "चौदह", "पंद्रह", "सोलह", "सत्रह", "अठारह", "उन्नीस",
    "बीस", "इक्कीस", "बाईस", "तेईस", "चौबीस", "पच्चीस", "छब्बीस", "सत्ताईस", "अट्ठाईस", "उनतीस",
    "तीस", "इकतीस", "बत्तीस", "तैंतीस", "चौंतीस", "पैंतीस", "छत्तीस", "सैंतीस", "अड़तीस", "उनतालीस",
    "चालीस", "इकतालीस", "बयालीस", "तैंतालीस", "चवालीस", "पैंतालीस", "छियालीस", "सैंतालीस", "अड़तालीस", "उनचास",
    "पचास", "इक्यावन", "बावन", "तिरेपन", "चौवन", "पचपन", "छप्पन", "सत्तावन", "अट्ठावन", "उनसठ",
    "साठ", "इकसठ", "बासठ", "तिरेसठ", "चौंसठ", "पैंसठ", "छियासठ", "सड़सठ", "अड़सठ", "उनहत्तर",
    "सत्तर", "इकहत्तर", "बहत्तर", "तिहत्तर", "चौहत्तर", "पचहत्तर", "छिहत्तर", "सतहत्तर", "अठहत्तर", "उन्यासी",
    "अस्सी", "इक्यासी", "बयासी", "तिरासी", "चौरासी", "पचासी", "छियासी", "सत्तासी", "अट्ठासी", "नवासी",
    "नब्बे", "इक्यानवे", "बानवे", "तिरानवे", "चौरानवे", "पचानवे", "छियानवे", "सत्तानवे", "अट्ठानवे", "निन्यानवे",
];

/// Indian grouping scales used by the Hindi reading
const HI_SCALES: [(u64, &str); 5] = [
    (1_000_000_000, "अरब"),
    (10_000_000, "करोड़"),
    (100_000, "लाख"),
    (1_000, "हजार"),
    (100, "सौ"),
];

/// Digit names and decimal point word for a digit-by-digit language
struct DigitNames {
    digits: [&'static str; 10],
    point: &'static str,
}

fn digit_names(lang: &str) -> Option<DigitNames> {
    let names = match lang {
        "en" => DigitNames {
            digits: EN_DIGITS,
            point: "point",
        },
        "hi" => DigitNames {
            digits: ["शून्य", "एक", "दो", "तीन", "चार", "पाँच", "छह", "सात", "आठ", "नौ"],
            point: "दशमलव",
        },
        "mr" => DigitNames {
            digits: ["शून्य", "एक", "दोन", "तीन", "चार", "पाच", "सहा", "सात", "आठ", "नऊ"],
            point: "दशांश",
        },
        "bn" => DigitNames {
            digits: ["শূন্য", "এক", "দুই", "তিন", "চার", "পাঁচ", "ছয়", "সাত", "আট", "নয়"],
            point: "দশমিক",
        },
        "as" => DigitNames {
            digits: ["শূন্য", "এক", "দুই", "তিনি", "চাৰি", "পাঁচ", "ছয়", "সাত", "আঠ", "ন"],
            point: "দশমিক",
        },
        "gu" => DigitNames {
            digits: ["શૂન્ય", "એક", "બે", "ત્રણ", "ચાર", "પાંચ", "છ", "સાત", "આઠ", "નવ"],
            point: "દશાંશ",
        },
        "pa" => DigitNames {
            digits: ["ਸਿਫ਼ਰ", "ਇੱਕ", "ਦੋ", "ਤਿੰਨ", "ਚਾਰ", "ਪੰਜ", "ਛੇ", "ਸੱਤ", "ਅੱਠ", "ਨੌਂ"],
            point: "ਦਸ਼ਮਲਵ",
        },
        "or" => DigitNames {
            digits: ["ଶୂନ", "ଏକ", "ଦୁଇ", "ତିନି", "ଚାରି", "ପାଞ୍ଚ", "ଛଅ", "ସାତ", "ଆଠ", "ନଅ"],
            point: "ଦଶମିକ",
        },
        "ta" => DigitNames {
            digits: [
                "பூஜ்ஜியம்", "ஒன்று", "இரண்டு", "மூன்று", "நான்கு", "ஐந்து", "ஆறு", "ஏழு", "எட்டு", "ஒன்பது",
            ],
            point: "புள்ளி",
        },
        "te" => DigitNames {
            digits: [
                "సున్నా", "ఒకటి", "రెండు", "మూడు", "నాలుగు", "ఐదు", "ఆరు", "ఏడు", "ఎనిమిది", "తొమ్మిది",
            ],
            point: "పాయింట్",
        },
        "kn" => DigitNames {
            digits: ["ಸೊನ್ನೆ", "ಒಂದು", "ಎರಡು", "ಮೂರು", "ನಾಲ್ಕು", "ಐದು", "ಆರು", "ಏಳು", "ಎಂಟು", "ಒಂಬತ್ತು"],
            point: "ಬಿಂದು",
        },
        "ml" => DigitNames {
            digits: ["പൂജ്യം", "ഒന്ന്", "രണ്ട്", "മൂന്ന്", "നാല്", "അഞ്ച്", "ആറ്", "ഏഴ്", "എട്ട്", "ഒമ്പത്"],
            point: "ദശാംശം",
        },
        _ => return None,
    };
    Some(names)
}

/// Numeric value of an ASCII or Indic digit
pub fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    let code = c as u32;
    INDIC_DIGIT_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&code))
        .map(|&zero| code - zero)
}

/// Expand every number in `text` into words of language `lang`
///
/// Text in languages without digit names is returned unchanged.
pub fn normalize_nums(text: &str, lang: &str) -> String {
    let Some(names) = digit_names(lang) else {
        return text.to_string();
    };

    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        if digit_value(chars[i]).is_none() {
            result.push(chars[i]);
            i += 1;
            continue;
        }

        let mut integer = Vec::new();
        let mut fraction = Vec::new();
        let mut in_fraction = false;

        while i < chars.len() {
            let c = chars[i];
            let next_is_digit = chars.get(i + 1).is_some_and(|&n| digit_value(n).is_some());
            if let Some(d) = digit_value(c) {
                if in_fraction {
                    fraction.push(d);
                } else {
                    integer.push(d);
                }
            } else if c == ',' && !in_fraction && next_is_digit {
                // thousands separator
            } else if c == '.' && !in_fraction && next_is_digit {
                in_fraction = true;
            } else {
                break;
            }
            i += 1;
        }

        result.push_str(&number_to_words(&integer, &fraction, lang, &names));
    }

    result
}

fn number_to_words(integer: &[u32], fraction: &[u32], lang: &str, names: &DigitNames) -> String {
    let mut words = if integer.len() > MAX_CARDINAL_DIGITS {
        digits_to_words(integer, names)
    } else {
        let value = integer.iter().fold(0u64, |acc, &d| acc * 10 + d as u64);
        match lang {
            "en" => english_cardinal(value),
            "hi" => hindi_cardinal(value),
            _ => digits_to_words(integer, names),
        }
    };

    if !fraction.is_empty() {
        words.push(' ');
        words.push_str(names.point);
        words.push(' ');
        words.push_str(&digits_to_words(fraction, names));
    }

    words
}

fn digits_to_words(digits: &[u32], names: &DigitNames) -> String {
    digits
        .iter()
        .map(|&d| names.digits[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// English cardinal reading, e.g. 123 -> "one hundred twenty three"
pub fn english_cardinal(num: u64) -> String {
    if num == 0 {
        return "zero".to_string();
    }

    let mut n = num;
    let mut result = Vec::new();

    for (value, word) in [
        (1_000_000_000_000, "trillion"),
        (1_000_000_000, "billion"),
        (1_000_000, "million"),
        (1_000, "thousand"),
    ] {
        if n >= value {
            result.push(format!("{} {}", english_cardinal(n / value), word));
            n %= value;
        }
    }

    if n >= 100 {
        result.push(format!("{} hundred", EN_ONES[(n / 100) as usize]));
        n %= 100;
    }

    if n >= 20 {
        let t = n / 10;
        let o = n % 10;
        if o > 0 {
            result.push(format!("{} {}", EN_TENS[t as usize], EN_ONES[o as usize]));
        } else {
            result.push(EN_TENS[t as usize].to_string());
        }
    } else if n > 0 {
        result.push(EN_ONES[n as usize].to_string());
    }

    result.join(" ")
}

/// Hindi cardinal reading with Indian grouping, e.g. 150000 -> "एक लाख पचास हजार"
pub fn hindi_cardinal(num: u64) -> String {
    if num < 100 {
        return HI_UNDER_HUNDRED[num as usize].to_string();
    }

    let mut n = num;
    let mut result = Vec::new();

    for (value, word) in HI_SCALES {
        if n >= value {
            result.push(format!("{} {}", hindi_cardinal(n / value), word));
            n %= value;
        }
    }

    if n > 0 {
        result.push(HI_UNDER_HUNDRED[n as usize].to_string());
    }

    result.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_numbers() {
        assert_eq!(normalize_nums("I have 5 apples", "en"), "I have five apples");
        assert_eq!(normalize_nums("Room 21", "en"), "Room twenty one");
        assert_eq!(
            normalize_nums("1,234 items", "en"),
            "one thousand two hundred thirty four items"
        );
        assert_eq!(normalize_nums("pi is 3.14", "en"), "pi is three point one four");
    }

    #[test]
    fn test_english_cardinal() {
        assert_eq!(english_cardinal(0), "zero");
        assert_eq!(english_cardinal(13), "thirteen");
        assert_eq!(english_cardinal(100), "one hundred");
        assert_eq!(english_cardinal(5_000_000), "five million");
    }

    #[test]
    fn test_hindi_numbers() {
        assert_eq!(hindi_cardinal(125), "एक सौ पच्चीस");
        assert_eq!(hindi_cardinal(150_000), "एक लाख पचास हजार");
        assert_eq!(hindi_cardinal(20_000_000), "दो करोड़");
        assert_eq!(normalize_nums("मेरे पास 2.5 किलो है", "hi"), "मेरे पास दो दशमलव पाँच किलो है");
    }

    #[test]
    fn test_native_digits() {
        assert_eq!(digit_value('\u{0967}'), Some(1));
        assert_eq!(digit_value('\u{0BEF}'), Some(9));
        assert_eq!(digit_value('a'), None);
        assert_eq!(normalize_nums("१२ लोग", "hi"), "बारह लोग");
    }

    #[test]
    fn test_digit_by_digit_languages() {
        assert_eq!(normalize_nums("42", "ta"), "நான்கு இரண்டு");
        assert_eq!(normalize_nums("೧೦", "kn"), "ಒಂದು ಸೊನ್ನೆ");
    }

    #[test]
    fn test_trailing_period_kept() {
        assert_eq!(normalize_nums("Page 7.", "en"), "Page seven.");
    }

    #[test]
    fn test_very_long_numbers_read_as_digits() {
        let text = "1234567890123456";
        let words = normalize_nums(text, "en");
        assert!(words.starts_with("one two three"));
        assert_eq!(words.split(' ').count(), 16);
    }

    #[test]
    fn test_unknown_language_unchanged() {
        assert_eq!(normalize_nums("J'ai 3 pommes", "fr"), "J'ai 3 pommes");
    }
}
