//! Starter questions per language

pub const BASE_LANGUAGE: &str = "en";

const ENGLISH: &[&str] = &[
    "What crops should I plant this season?",
    "How much fertilizer do I need for wheat?",
    "How to control pests in my crop?",
    "When is the right time to harvest?",
];

const HINDI: &[&str] = &[
    "इस सीजन में कौन सी फसल लगानी चाहिए?",
    "गेहूं के लिए कितना उर्वरक चाहिए?",
    "फसल में कीड़े कैसे नियंत्रित करें?",
    "फसल काटने का सही समय कब है?",
];

const PUNJABI: &[&str] = &[
    "ਇਸ ਸੀਜ਼ਨ ਵਿੱਚ ਕਿਹੜੀ ਫਸਲ ਲਗਾਉਣੀ ਚਾਹੀਦੀ ਹੈ?",
    "ਕਣਕ ਲਈ ਕਿੰਨੀ ਖਾਦ ਚਾਹੀਦੀ ਹੈ?",
    "ਫਸਲ ਵਿੱਚ ਕੀੜੇ ਕਿਵੇਂ ਕੰਟਰੋਲ ਕਰੀਏ?",
    "ਫਸਲ ਵੱਢਣ ਦਾ ਸਹੀ ਸਮਾਂ ਕਦੋਂ ਹੈ?",
];

/// Questions for `lang`, or the English set when `lang` has none
pub fn default_questions(lang: &str) -> &'static [&'static str] {
    match lang.trim().to_lowercase().as_str() {
        "hi" => HINDI,
        "pa" => PUNJABI,
        _ => ENGLISH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages() {
        assert_eq!(default_questions("hi")[1], "गेहूं के लिए कितना उर्वरक चाहिए?");
        assert_eq!(default_questions("PA").len(), 4);
    }

    #[test]
    fn test_falls_back_to_base_language() {
        assert_eq!(default_questions("ta"), default_questions(BASE_LANGUAGE));
        assert_eq!(default_questions("")[0], "What crops should I plant this season?");
    }
}
