//! The closed keyword set of the expression language
//!
//! Two groups share one token kind: the operator/connective keywords
//! (`and`, `implies`, `div`, ...) and the built-in function names the parser
//! recognizes as distinct tokens. Several keywords belong to both worlds:
//! `contains` is an infix membership operator and a string function, `div`
//! and `mod` are arithmetic operators that can also be invoked as methods.

/// Keyword tokens recognized by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Logical connectives and type operators
    And,
    Or,
    Xor,
    Implies,
    Not,
    In,
    Contains,
    Is,
    As,
    Div,
    Mod,
    True,
    False,

    // Function-name keywords
    Where,
    Select,
    Exists,
    Empty,
    All,
    Any,
    Matches,
    Substring,
    ReplaceMatches,
    Descendants,
    Trace,
    Combine,
    Intersect,
    IsDistinct,
    Distinct,
    Repeat,
    DefineVariable,
    HasValue,
    Children,
    MemberOf,
    HtmlChecks,
    ToInteger,
    ToString,
    ToDateTime,
    Length,
    StartsWith,
    EndsWith,
    Tail,
    Take,
    Skip,
    Trim,
    Split,
    Join,
    ToChars,
    IndexOf,
    LastIndexOf,
    Replace,
    Encode,
    Decode,
    Escape,
    Unescape,
    Lower,
    Upper,
    Resolve,
    Extension,
}

impl Keyword {
    /// Look up a scanned word against the keyword set (exact, case-sensitive).
    pub fn from_str(word: &str) -> Option<Self> {
        match word {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "xor" => Some(Self::Xor),
            "implies" => Some(Self::Implies),
            "not" => Some(Self::Not),
            "in" => Some(Self::In),
            "contains" => Some(Self::Contains),
            "is" => Some(Self::Is),
            "as" => Some(Self::As),
            "div" => Some(Self::Div),
            "mod" => Some(Self::Mod),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "where" => Some(Self::Where),
            "select" => Some(Self::Select),
            "exists" => Some(Self::Exists),
            "empty" => Some(Self::Empty),
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            "matches" => Some(Self::Matches),
            "substring" => Some(Self::Substring),
            "replaceMatches" => Some(Self::ReplaceMatches),
            "descendants" => Some(Self::Descendants),
            "trace" => Some(Self::Trace),
            "combine" => Some(Self::Combine),
            "intersect" => Some(Self::Intersect),
            "isDistinct" => Some(Self::IsDistinct),
            "distinct" => Some(Self::Distinct),
            "repeat" => Some(Self::Repeat),
            "defineVariable" => Some(Self::DefineVariable),
            "hasValue" => Some(Self::HasValue),
            "children" => Some(Self::Children),
            "memberOf" => Some(Self::MemberOf),
            "htmlChecks" => Some(Self::HtmlChecks),
            "toInteger" => Some(Self::ToInteger),
            "toString" => Some(Self::ToString),
            "toDateTime" => Some(Self::ToDateTime),
            "length" => Some(Self::Length),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            "tail" => Some(Self::Tail),
            "take" => Some(Self::Take),
            "skip" => Some(Self::Skip),
            "trim" => Some(Self::Trim),
            "split" => Some(Self::Split),
            "join" => Some(Self::Join),
            "toChars" => Some(Self::ToChars),
            "indexOf" => Some(Self::IndexOf),
            "lastIndexOf" => Some(Self::LastIndexOf),
            "replace" => Some(Self::Replace),
            "encode" => Some(Self::Encode),
            "decode" => Some(Self::Decode),
            "escape" => Some(Self::Escape),
            "unescape" => Some(Self::Unescape),
            "lower" => Some(Self::Lower),
            "upper" => Some(Self::Upper),
            "resolve" => Some(Self::Resolve),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }

    /// The keyword as it appears in expression source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::Not => "not",
            Self::In => "in",
            Self::Contains => "contains",
            Self::Is => "is",
            Self::As => "as",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::True => "true",
            Self::False => "false",
            Self::Where => "where",
            Self::Select => "select",
            Self::Exists => "exists",
            Self::Empty => "empty",
            Self::All => "all",
            Self::Any => "any",
            Self::Matches => "matches",
            Self::Substring => "substring",
            Self::ReplaceMatches => "replaceMatches",
            Self::Descendants => "descendants",
            Self::Trace => "trace",
            Self::Combine => "combine",
            Self::Intersect => "intersect",
            Self::IsDistinct => "isDistinct",
            Self::Distinct => "distinct",
            Self::Repeat => "repeat",
            Self::DefineVariable => "defineVariable",
            Self::HasValue => "hasValue",
            Self::Children => "children",
            Self::MemberOf => "memberOf",
            Self::HtmlChecks => "htmlChecks",
            Self::ToInteger => "toInteger",
            Self::ToString => "toString",
            Self::ToDateTime => "toDateTime",
            Self::Length => "length",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Tail => "tail",
            Self::Take => "take",
            Self::Skip => "skip",
            Self::Trim => "trim",
            Self::Split => "split",
            Self::Join => "join",
            Self::ToChars => "toChars",
            Self::IndexOf => "indexOf",
            Self::LastIndexOf => "lastIndexOf",
            Self::Replace => "replace",
            Self::Encode => "encode",
            Self::Decode => "decode",
            Self::Escape => "escape",
            Self::Unescape => "unescape",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Resolve => "resolve",
            Self::Extension => "extension",
        }
    }

    /// Keywords that may be used as a function name (`x.contains('a')`,
    /// `value.not()`). Everything outside the pure connectives qualifies.
    pub fn is_function_name(&self) -> bool {
        !matches!(
            self,
            Self::And
                | Self::Or
                | Self::Xor
                | Self::Implies
                | Self::In
                | Self::Is
                | Self::As
                | Self::True
                | Self::False
        )
    }

    /// The small set of keywords the grammar also accepts as a property name
    /// after a dot (`Encounter.class.div`, `grouping.or`).
    pub fn is_property_name(&self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Or
                | Self::Implies
                | Self::Div
                | Self::Mod
                | Self::Xor
                | Self::True
                | Self::False
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_keyword() {
        let words = [
            "and", "or", "xor", "implies", "not", "in", "contains", "is", "as", "div", "mod",
            "true", "false", "where", "select", "exists", "empty", "all", "any", "matches",
            "substring", "replaceMatches", "descendants", "trace", "combine", "intersect",
            "isDistinct", "distinct", "repeat", "defineVariable", "hasValue", "children",
            "memberOf", "htmlChecks", "toInteger", "toString", "toDateTime", "length",
            "startsWith", "endsWith", "tail", "take", "skip", "trim", "split", "join", "toChars",
            "indexOf", "lastIndexOf", "replace", "encode", "decode", "escape", "unescape",
            "lower", "upper", "resolve", "extension",
        ];
        for word in words {
            let kw = Keyword::from_str(word).unwrap_or_else(|| panic!("missing keyword {word}"));
            assert_eq!(kw.as_str(), word);
        }
    }

    #[test]
    fn case_sensitive_lookup() {
        assert_eq!(Keyword::from_str("And"), None);
        assert_eq!(Keyword::from_str("WHERE"), None);
        assert_eq!(Keyword::from_str("tostring"), None);
    }

    #[test]
    fn classification_overlap() {
        // `contains`, `div` and `mod` are both operators and callable names.
        assert!(Keyword::Contains.is_function_name());
        assert!(Keyword::Div.is_function_name());
        assert!(Keyword::Div.is_property_name());
        // Pure connectives are never function names.
        assert!(!Keyword::And.is_function_name());
        assert!(Keyword::And.is_property_name());
        assert!(!Keyword::In.is_property_name());
    }
}
