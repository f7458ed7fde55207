//! Path and filename metadata extraction.
//!
//! Lab folders encode part type, model, line, process and shift in directory
//! names; operators add their initials, piece and cavity to the filename.
//! Each attribute has an ordered list of rules and the first rule that yields
//! a value wins. Rules for different attributes never affect each other.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use labdata_core::ExtractionSettings;
use labdata_store::{FileContext, NOT_APPLICABLE, UNKNOWN};

static LINE_DIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:LINE\s*|L)([0-9]+)\b").unwrap());
static OP_DIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^OP\s*-?[0-9]+\b").unwrap());
static LINE_ANY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:LINE\s*|L)([0-9]+)\b").unwrap());
// 80LL is listed before [1-9]0 so `#80LL` is not cut short to `#80`.
static PROCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(?:80LL|1[0-9]0|200|[1-9]0)|MQC").unwrap());
static NAME_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());
static PROCESS_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^P?([0-9]{1,3})$").unwrap());
static PIECE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\\/ ]([13])(ATC|BTC|TC|F|M|L)").unwrap());
static CAVITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Cavity-([A-Za-z0-9_]+)").unwrap());

/// Filename tokens that name the intake/exhaust side, never an operator.
const SIDE_TOKENS: [&str; 2] = ["EX", "IN"];

/// A file path split into the pieces rules look at.
#[derive(Debug, Clone)]
pub struct PathView<'a> {
    pub full: &'a str,
    pub upper: String,
    /// Directory components, root first.
    pub dirs: Vec<&'a str>,
    pub file_name: &'a str,
    /// File name without its final extension.
    pub stem: &'a str,
}

impl<'a> PathView<'a> {
    /// Accepts both `/` and `\` separators; lab paths come from Windows shares.
    pub fn new(full: &'a str) -> Self {
        let mut dirs: Vec<&str> = full.split(['/', '\\']).filter(|p| !p.is_empty()).collect();
        let file_name = dirs.pop().unwrap_or("");
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem);
        Self {
            full,
            upper: full.to_uppercase(),
            dirs,
            file_name,
            stem,
        }
    }

    fn dirs_upper(&self) -> String {
        self.dirs.join("/").to_uppercase()
    }
}

// ---------------------------------------------------------------
// Rules
// ---------------------------------------------------------------

pub fn part_type(view: &PathView<'_>) -> Option<String> {
    if view.upper.contains("REAR COVER") {
        Some("Rear Cover".to_string())
    } else if view.upper.contains("CAM HOUSING") {
        Some("Cam Housing".to_string())
    } else {
        None
    }
}

/// First known model token found anywhere in the path.
pub fn model_token(view: &PathView<'_>, models: &[String]) -> Option<String> {
    models
        .iter()
        .find(|m| view.upper.contains(&m.to_uppercase()))
        .cloned()
}

/// Short model aliases (`967`, `031`), matched in directory names only so
/// filename digit runs cannot trigger them.
pub fn model_alias(view: &PathView<'_>, aliases: &[(String, String)]) -> Option<String> {
    let dirs = view.dirs_upper();
    aliases
        .iter()
        .find(|(token, _)| dirs.contains(&token.to_uppercase()))
        .map(|(_, model)| model.clone())
}

/// The folder holding a `Surfcom` folder is named after the model.
pub fn model_from_surfcom_parent(view: &PathView<'_>) -> Option<String> {
    view.dirs
        .windows(2)
        .rev()
        .find(|w| w[1].eq_ignore_ascii_case("surfcom"))
        .map(|w| w[0].to_string())
}

/// Deepest `LINE n` / `Ln` folder, normalized to `LINE n`.
pub fn line_folder(view: &PathView<'_>) -> Option<String> {
    view.dirs
        .iter()
        .rev()
        .find_map(|d| LINE_DIR_RE.captures(d.trim()))
        .map(|c| format!("LINE {}", &c[1]))
}

/// Deepest operation folder (`OP20`, `OP 30`), kept as written.
pub fn op_folder(view: &PathView<'_>) -> Option<String> {
    view.dirs
        .iter()
        .rev()
        .map(|d| d.trim())
        .find(|d| OP_DIR_RE.is_match(d))
        .map(str::to_string)
}

/// Deepest folder containing one of the known sub-area names.
pub fn known_sub_area(view: &PathView<'_>, names: &[String]) -> Option<String> {
    view.dirs.iter().rev().find_map(|d| {
        let upper = d.to_uppercase();
        names
            .iter()
            .find(|n| upper.contains(&n.to_uppercase()))
            .cloned()
    })
}

pub fn line_number_folder(view: &PathView<'_>) -> Option<String> {
    view.dirs
        .iter()
        .rev()
        .find_map(|d| LINE_DIR_RE.captures(d.trim()))
        .map(|c| c[1].to_string())
}

pub fn line_number_anywhere(view: &PathView<'_>) -> Option<String> {
    LINE_ANY_RE.captures(view.full).map(|c| c[1].to_string())
}

/// `#10`..`#190`, `#200`, `#80LL` or `MQC` anywhere in the path.
pub fn process_code(view: &PathView<'_>) -> Option<String> {
    PROCESS_RE.find(&view.upper).map(|m| m.as_str().to_string())
}

/// Filename tokens of a process-coded name such as `P30 2 JD`.
fn coded_name_tokens<'v>(view: &PathView<'v>) -> Option<(String, Vec<&'v str>)> {
    let tokens: Vec<&str> = NAME_TOKEN_RE
        .find_iter(view.stem)
        .map(|m| m.as_str())
        .collect();
    if tokens.len() < 3 {
        return None;
    }
    let process = PROCESS_TOKEN_RE.captures(tokens[0])?[1].to_string();
    Some((process, tokens))
}

/// Process number from a leading `P30`-style filename token.
pub fn process_token(view: &PathView<'_>) -> Option<String> {
    coded_name_tokens(view).map(|(process, _)| process)
}

/// Item number: the token after the process code.
pub fn item_token(view: &PathView<'_>) -> Option<String> {
    coded_name_tokens(view).map(|(_, tokens)| tokens[1].to_string())
}

pub fn shift_ordinal(view: &PathView<'_>) -> Option<String> {
    [("1ST", "1"), ("2ND", "2"), ("3RD", "3")]
        .iter()
        .find(|(token, _)| view.upper.contains(token))
        .map(|(_, shift)| shift.to_string())
}

/// A `1F` / `3TC` piece token also tells which shift measured it.
pub fn shift_from_piece(view: &PathView<'_>) -> Option<String> {
    PIECE_RE.captures(view.full).map(|c| c[1].to_string())
}

pub fn piece(view: &PathView<'_>) -> Option<String> {
    PIECE_RE.captures(view.full).map(|c| c[2].to_string())
}

pub fn cavity(view: &PathView<'_>, max_len: usize) -> Option<String> {
    CAVITY_RE
        .captures(view.file_name)
        .map(|c| c[1].chars().take(max_len).collect())
}

/// Initials as the last whitespace-separated word of the name: `HEAD EX JD`.
pub fn operator_trailing_token(view: &PathView<'_>) -> Option<String> {
    let mut tokens = view.stem.split_whitespace();
    let last = tokens.next_back()?;
    tokens.next()?;
    let is_initials = (1..=4).contains(&last.len())
        && last.chars().all(|c| c.is_ascii_alphabetic())
        && !SIDE_TOKENS.iter().any(|s| last.eq_ignore_ascii_case(s));
    is_initials.then(|| last.to_uppercase())
}

/// Initials as the third token of a process-coded name: `P30_2_JD`.
pub fn operator_coded_token(view: &PathView<'_>) -> Option<String> {
    let (_, tokens) = coded_name_tokens(view)?;
    let letters: String = tokens[2]
        .chars()
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    (!letters.is_empty()).then(|| letters.to_uppercase())
}

/// Initials as the last two characters of a name without spaces: `HEADEXJD`.
pub fn operator_trailing_chars(view: &PathView<'_>) -> Option<String> {
    if view.stem.contains(char::is_whitespace) {
        return None;
    }
    let chars: Vec<char> = view.stem.chars().collect();
    if chars.len() < 2 {
        return None;
    }
    let tail = &chars[chars.len() - 2..];
    tail.iter()
        .all(|c| c.is_ascii_alphabetic())
        .then(|| tail.iter().collect::<String>().to_uppercase())
}

// ---------------------------------------------------------------
// Rule lists
// ---------------------------------------------------------------

pub type RuleFn = Box<dyn Fn(&PathView<'_>) -> Option<String> + Send + Sync>;

/// A named rule producing a value for one attribute.
pub struct Rule {
    pub name: &'static str,
    apply: RuleFn,
}

impl Rule {
    pub fn apply(&self, view: &PathView<'_>) -> Option<String> {
        (self.apply)(view)
    }
}

/// FileContext attributes derived from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    PartType,
    Model,
    SubArea,
    LineNo,
    Process,
    ItemNo,
    Shift,
    Piece,
    Cavity,
    OperatorInitials,
}

/// Ordered rules for one attribute plus the value used when none match.
pub struct AttributeRules {
    pub attribute: Attribute,
    pub default: &'static str,
    rules: Vec<Rule>,
}

impl AttributeRules {
    pub fn new(attribute: Attribute, default: &'static str) -> Self {
        Self {
            attribute,
            default,
            rules: Vec::new(),
        }
    }

    pub fn rule(
        mut self,
        name: &'static str,
        apply: impl Fn(&PathView<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.rules.push(Rule {
            name,
            apply: Box::new(apply),
        });
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule value, or the default.
    pub fn resolve(&self, view: &PathView<'_>) -> String {
        for rule in &self.rules {
            if let Some(value) = rule.apply(view) {
                trace!("{:?} = {} ({})", self.attribute, value, rule.name);
                return value;
            }
        }
        self.default.to_string()
    }
}

/// Builds a FileContext from a file path.
pub struct MetadataExtractor {
    attributes: Vec<AttributeRules>,
}

impl MetadataExtractor {
    pub fn new(settings: &ExtractionSettings) -> Self {
        let models: Vec<String> = settings
            .rear_cover_models
            .iter()
            .chain(&settings.cam_housing_models)
            .cloned()
            .collect();
        let aliases = settings.model_aliases.clone();
        let sub_areas = settings.sub_areas.clone();
        let cavity_len = settings.cavity_length;

        let attributes = vec![
            AttributeRules::new(Attribute::PartType, UNKNOWN).rule("part_type", part_type),
            AttributeRules::new(Attribute::Model, UNKNOWN)
                .rule("model_token", move |v| model_token(v, &models))
                .rule("model_alias", move |v| model_alias(v, &aliases))
                .rule("surfcom_parent", model_from_surfcom_parent),
            AttributeRules::new(Attribute::SubArea, UNKNOWN)
                .rule("line_folder", line_folder)
                .rule("op_folder", op_folder)
                .rule("known_sub_area", move |v| known_sub_area(v, &sub_areas)),
            AttributeRules::new(Attribute::LineNo, "")
                .rule("line_number_folder", line_number_folder)
                .rule("line_number_anywhere", line_number_anywhere),
            AttributeRules::new(Attribute::Process, NOT_APPLICABLE)
                .rule("process_code", process_code)
                .rule("process_token", process_token),
            AttributeRules::new(Attribute::ItemNo, UNKNOWN).rule("item_token", item_token),
            AttributeRules::new(Attribute::Shift, "")
                .rule("shift_ordinal", shift_ordinal)
                .rule("shift_from_piece", shift_from_piece),
            AttributeRules::new(Attribute::Piece, NOT_APPLICABLE).rule("piece", piece),
            AttributeRules::new(Attribute::Cavity, NOT_APPLICABLE)
                .rule("cavity", move |v| cavity(v, cavity_len)),
            AttributeRules::new(Attribute::OperatorInitials, UNKNOWN)
                .rule("trailing_token", operator_trailing_token)
                .rule("coded_token", operator_coded_token)
                .rule("trailing_chars", operator_trailing_chars),
        ];

        Self { attributes }
    }

    pub fn attribute_rules(&self) -> &[AttributeRules] {
        &self.attributes
    }

    /// Derive every path attribute of `file_path`. The report date is left
    /// at its default for the date resolver to fill.
    pub fn extract(&self, file_path: &str) -> FileContext {
        let view = PathView::new(file_path);
        let mut ctx = FileContext::new(file_path, view.file_name);

        for rules in &self.attributes {
            let value = rules.resolve(&view);
            let slot = match rules.attribute {
                Attribute::PartType => &mut ctx.part_type,
                Attribute::Model => &mut ctx.model,
                Attribute::SubArea => &mut ctx.sub_area,
                Attribute::LineNo => &mut ctx.line_no,
                Attribute::Process => &mut ctx.process,
                Attribute::ItemNo => &mut ctx.item_no,
                Attribute::Shift => &mut ctx.shift,
                Attribute::Piece => &mut ctx.piece,
                Attribute::Cavity => &mut ctx.cavity,
                Attribute::OperatorInitials => &mut ctx.operator_initials,
            };
            *slot = value;
        }
        ctx
    }
}
