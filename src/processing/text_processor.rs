//! Text normalization, tokenization and candidate n-gram generation

use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

pub struct TextProcessor {
    stop_words: HashSet<&'static str>,
    whitespace_regex: Regex,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        let whitespace_regex = Regex::new(r"\s+").expect("Invalid whitespace regex");

        Self {
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
            whitespace_regex,
        }
    }

    /// Collapse whitespace and fold typographic punctuation to ASCII
    pub fn clean_text(&self, text: &str) -> String {
        let folded: String = text
            .chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201C}' | '\u{201D}' => '"',
                '\u{2013}' | '\u{2014}' => '-',
                '\u{2022}' | '\u{25CF}' => '.',
                _ => c,
            })
            .collect();

        self.whitespace_regex.replace_all(&folded, " ").trim().to_string()
    }

    /// Lowercased word tokens of two or more characters, stop words removed
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| word.to_lowercase())
            .filter(|token| self.keep_token(token))
            .collect()
    }

    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        text.unicode_sentences()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Sentences of `text`, treating every line break as a boundary so
    /// bullet and line-per-skill lists are not joined into one sentence
    pub fn split_segments(&self, text: &str) -> Vec<String> {
        text.lines()
            .map(|line| self.clean_text(line))
            .filter(|line| !line.is_empty())
            .flat_map(|line| self.split_sentences(&line))
            .collect()
    }

    /// Unique n-grams of `min_n..=max_n` filtered tokens, in first-occurrence order.
    ///
    /// N-grams are built per sentence and per line so a phrase never spans
    /// either boundary. At the same start position shorter n-grams come first.
    pub fn candidate_ngrams(&self, text: &str, min_n: usize, max_n: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        if min_n == 0 || min_n > max_n {
            return candidates;
        }

        for sentence in self.split_segments(text) {
            let tokens = self.tokenize(&sentence);
            for start in 0..tokens.len() {
                for n in min_n..=max_n {
                    if start + n > tokens.len() {
                        break;
                    }
                    let phrase = tokens[start..start + n].join(" ");
                    if seen.insert(phrase.clone()) {
                        candidates.push(phrase);
                    }
                }
            }
        }

        candidates
    }

    fn keep_token(&self, token: &str) -> bool {
        token.chars().count() > 1
            && token.chars().any(|c| c.is_alphanumeric())
            && !self.stop_words.contains(token)
    }
}

/// General English stop-word list (scikit-learn's `ENGLISH_STOP_WORDS`)
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
    "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
    "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call",
    "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail",
    "do", "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together",
    "too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up",
    "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];
