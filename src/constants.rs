//! Vocabulary tables and storage limits shared across the crate.
//!
//! The vocabularies are part of the on-disk format: indices are persisted inside every compact
//! token, so entries may only ever be appended.

/// Version of the POS/morphology vocabularies below.
pub const VOCABULARY_VERSION: u16 = 1;

/// Universal POS tags, in storage index order.
pub const POS_CLASSES: [&str; 17] = [
    "ADJ", "ADP", "ADV", "AUX", "CCONJ", "DET", "INTJ", "NOUN", "NUM", "PART", "PRON", "PROPN",
    "PUNCT", "SCONJ", "SYM", "VERB", "X",
];

/// Most frequent morphological feature strings, in storage index order. Features outside this
/// table are stored verbatim.
pub const MORPH_CLASSES: [&str; 86] = [
    "\u{2205}",
    "Number=Sing",
    "Gender=Masc",
    "Gender=Fem",
    "Number=Plur",
    "PronType=Art",
    "Definite=Def",
    "Person=3",
    "VerbForm=Fin",
    "Mood=Ind",
    "Case=Nom",
    "NumType=Card",
    "Tense=Past",
    "Tense=Pres",
    "Case=Dat",
    "VerbForm=Part",
    "Gender=Neut",
    "PronType=Prs",
    "Case=Acc",
    "Definite=Ind",
    "Degree=Pos",
    "NumForm=Digit",
    "Foreign=Yes",
    "PunctType=Comm",
    "Case=Gen",
    "VerbForm=Inf",
    "PunctType=Peri",
    "PunctType=Brck",
    "PronType=Dem",
    "PronType=Rel",
    "Poss=Yes",
    "Voice=Pass",
    "PronType=Ind",
    "VerbForm=Ger",
    "Reflex=Yes",
    "PrepCase=Npr",
    "PunctType=Quot",
    "PunctSide=Fin",
    "PunctSide=Ini",
    "Tense=Imp",
    "PronType=Int,Rel",
    "NumType=Ord",
    "Polarity=Neg",
    "AdvType=Tim",
    "PunctType=Colo",
    "Degree=Cmp",
    "Clitic=Yes",
    "Number[psor]=Sing",
    "Mood=Sub",
    "Person=1",
    "Person[psor]=3",
    "PronType=Neg",
    "Person=2",
    "PronType=Tot",
    "PunctType=Semi",
    "PronType=Int",
    "Gender[psor]=Masc,Neut",
    "Tense=Fut",
    "Mood=Cnd",
    "Number[psor]=Plur",
    "Degree=Sup",
    "PunctType=Dash",
    "Mood=Imp",
    "Case=Acc,Nom",
    "NumType=Frac",
    "Person[psor]=2",
    "Abbr=Yes",
    "PunctType=Qest",
    "NumForm=Word",
    "Person[psor]=1",
    "PunctType=Excl",
    "Degree=Abs",
    "ExtPos=ADP",
    "PrepCase=Pre",
    "NumType=Mult",
    "NumForm=Roman",
    "PronType=Emp",
    "Typo=Yes",
    "Polarity=Pos",
    "PronType=Exc",
    "Polite=Form",
    "Case=Com",
    "ExtPos=ADV",
    "Verbform=Fin",
    "Style=Slng",
    "Verbform=Inf",
];

/// Separator between the features of a single word.
pub const MORPH_FEATURE_SEPARATOR: &str = "|";
/// Separator between the feature lists of the words of a multi-word token.
pub const MULTIWORD_MORPH_SEPARATOR: &str = "___";
/// Named-entity tag for tokens outside any entity.
pub const NER_OUTSIDE: &str = "O";

/// Default zstd level used for page text.
pub const DEFAULT_TEXT_COMPRESSION_LEVEL: i32 = 3;
/// Per-record size ceiling of the document store (16 MiB).
pub const DEFAULT_MAX_RECORD_BYTES: usize = 16 * 1024 * 1024;

/// Collection holding page records.
pub const PAGES_COLLECTION: &str = "pages";
/// Collection holding linked annotation records.
pub const ANNOTATIONS_COLLECTION: &str = "annotations";
/// Collection holding interlanguage link records.
pub const INTERLANGUAGE_LINKS_COLLECTION: &str = "interlanguage-links";
/// Record field checked by `DocumentStore::replace_if_revision`; absent reads as 0.
pub const REVISION_FIELD: &str = "revision";

/// Magic prefix of a `FileStore` journal.
pub const JOURNAL_MAGIC: [u8; 4] = *b"MSJ\0";
/// Journal format version.
pub const JOURNAL_VERSION: u16 = 0x0001;
