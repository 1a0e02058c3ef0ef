//! # Tag Registry
//!
//! Static table of the linguistic tags a span may carry. Every tag has a
//! short machine `code` (what the engine stores), a short `label` (what the
//! user sees and what the serializer writes) and a long `description`.
//!
//! The inline notation may use either form, so lookups by label are
//! case-insensitive.

/// Category a tag is displayed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagGroup {
    /// Members of the sentence (subject, predicate, ...).
    SentenceMember,
    /// Function words (prepositions, particles, ...).
    FunctionWord,
    /// Content parts of speech (noun, verb, ...).
    PartOfSpeech,
}

impl TagGroup {
    pub const ALL: [TagGroup; 3] = [
        TagGroup::SentenceMember,
        TagGroup::FunctionWord,
        TagGroup::PartOfSpeech,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TagGroup::SentenceMember => "ЧлПред",
            TagGroup::FunctionWord => "Служ",
            TagGroup::PartOfSpeech => "ЧасРеч",
        }
    }
}

/// An immutable registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDescriptor {
    pub code: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub group: TagGroup,
}

const fn tag(
    code: &'static str,
    label: &'static str,
    description: &'static str,
    group: TagGroup,
) -> TagDescriptor {
    TagDescriptor {
        code,
        label,
        description,
        group,
    }
}

/// All known tags, in toolbar order.
pub static TAGS: [TagDescriptor; 20] = [
    tag("subj", "П", "Подлежащее", TagGroup::SentenceMember),
    tag("pred", "Ск", "Сказуемое", TagGroup::SentenceMember),
    tag("obj", "Д", "Дополнение", TagGroup::SentenceMember),
    tag("advm", "Об", "Обстоятельство", TagGroup::SentenceMember),
    tag("attr", "Оп", "Определение", TagGroup::SentenceMember),
    tag("pattr", "Оск", "Определение к сказуемому", TagGroup::SentenceMember),
    tag("nom", "ИЧ", "Именная часть сказуемого", TagGroup::SentenceMember),
    tag("prep", "Пр", "Предлог", TagGroup::FunctionWord),
    tag("conj", "Сз", "Союз", TagGroup::FunctionWord),
    tag("epart", "Вч", "Выделительная частица", TagGroup::FunctionWord),
    tag("mpart", "Мч", "Модальная частица", TagGroup::FunctionWord),
    tag("neg", "Отр", "Отрицание", TagGroup::FunctionWord),
    tag("cop", "Св", "Связка", TagGroup::FunctionWord),
    // The leading "C" is Latin; existing files depend on it.
    tag("n", "Cущ", "Существительное", TagGroup::PartOfSpeech),
    tag("v", "Гл", "Глагол", TagGroup::PartOfSpeech),
    tag("adj", "Прл", "Прилагательное", TagGroup::PartOfSpeech),
    tag("adv", "Нар", "Наречие", TagGroup::PartOfSpeech),
    tag("pron", "Мст", "Местоимение", TagGroup::PartOfSpeech),
    tag("num", "Чсл", "Числительное", TagGroup::PartOfSpeech),
    tag("intrj", "Мж", "Междометие", TagGroup::PartOfSpeech),
];

/// Display colours assigned to annotations by index, cyclically.
pub static PALETTE: [&str; 15] = [
    "#F44336", // red
    "#2196F3", // blue
    "#FF9800", // orange
    "#9C27B0", // purple
    "#4CAF50", // green
    "#E91E63", // pink
    "#00BCD4", // cyan
    "#FF5722", // deep orange
    "#3F51B5", // indigo
    "#8BC34A", // light green
    "#795548", // brown
    "#009688", // teal
    "#FFC107", // amber
    "#607D8B", // blue grey
    "#673AB7", // deep purple
];

/// Colour for the annotation with the given sequential index.
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Look up a tag by its code.
pub fn lookup(code: &str) -> Option<&'static TagDescriptor> {
    TAGS.iter().find(|t| t.code == code)
}

/// Look up a tag code by its label.
pub fn lookup_by_label(label: &str, case_insensitive: bool) -> Option<&'static str> {
    if case_insensitive {
        let wanted = label.to_lowercase();
        TAGS.iter()
            .find(|t| t.label.to_lowercase() == wanted)
            .map(|t| t.code)
    } else {
        TAGS.iter().find(|t| t.label == label).map(|t| t.code)
    }
}

/// Every tag code, in registry order.
pub fn all_codes() -> impl Iterator<Item = &'static str> {
    TAGS.iter().map(|t| t.code)
}

/// Tags belonging to one group, in registry order.
pub fn codes_in_group(group: TagGroup) -> impl Iterator<Item = &'static TagDescriptor> {
    TAGS.iter().filter(move |t| t.group == group)
}

/// Resolve a token from the inline notation: exact code first, then label
/// ignoring case.
pub fn resolve_token(token: &str) -> Option<&'static str> {
    lookup(token)
        .map(|t| t.code)
        .or_else(|| lookup_by_label(token, true))
}

/// Display label for a code, falling back to the code itself.
pub fn label_for(code: &str) -> &str {
    lookup(code).map_or(code, |t| t.label)
}
