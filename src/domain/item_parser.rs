use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;

use super::{ImageValidator, MenuItem};

const FOOD_KEYWORDS: [&str; 9] = [
    "dumpling", "noodle", "soup", "rice", "chicken", "beef", "pork", "tofu", "bao",
];
const DESCRIPTION_SEPARATOR: &str = " • ";
// Labels the keyword strategy leaves out of descriptions.
const KEYWORD_SKIPPED_PREFIXES: [&str; 2] = ["Popular", "most liked"];
const NON_RENDERED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];
const INLINE_TAGS: [&str; 22] = [
    "a", "abbr", "b", "bdi", "cite", "code", "del", "em", "i", "img", "ins", "label", "mark",
    "picture", "q", "s", "small", "span", "strong", "sub", "sup", "time",
];

/// Flattened view of one rendered menu item element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemSnapshot {
    /// Text nodes in document order, one per line.
    pub text: String,
    pub image_src: Option<String>,
}

impl ItemSnapshot {
    pub fn new(text: impl Into<String>, image_src: Option<String>) -> Self {
        ItemSnapshot {
            text: text.into(),
            image_src,
        }
    }

    /// Builds a snapshot from the text the browser rendered for an element and
    /// its outer html. The html supplies the image, and the text when the
    /// browser rendered none.
    pub fn from_rendered(rendered_text: &str, outer_html: &str) -> Self {
        let fragment = Html::parse_fragment(outer_html);

        let text = match normalize_lines(rendered_text.lines()) {
            text if text.is_empty() => flatten_text(fragment.root_element()),
            text => text,
        };

        ItemSnapshot {
            text,
            image_src: first_image_src(&fragment),
        }
    }

    /// Builds a snapshot from outer html alone, approximating rendered text.
    pub fn from_html(html: &str) -> Self {
        Self::from_rendered("", html)
    }

    fn lines(&self) -> Vec<&str> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

fn normalize_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines
        .map(|line| line.split_whitespace().collect::<Vec<&str>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<String>>()
        .join("\n")
}

/// Text of `element` with one line per block, skipping non-rendered subtrees.
fn flatten_text(element: ElementRef<'_>) -> String {
    let mut lines = vec![String::new()];
    push_text(element, &mut lines);
    normalize_lines(lines.iter().map(String::as_str))
}

fn push_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    let tag = element.value().name();
    if NON_RENDERED_TAGS.contains(&tag) {
        return;
    }
    let block = !INLINE_TAGS.contains(&tag);
    if block {
        lines.push(String::new());
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if let Some(line) = lines.last_mut() {
                    line.push_str(text);
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_text(child, lines);
                }
            }
            _ => {}
        }
    }

    if block {
        lines.push(String::new());
    }
}

fn first_image_src(fragment: &Html) -> Option<String> {
    let img_selector = Selector::parse("img").ok()?;
    let img = fragment.select(&img_selector).next()?;
    img.value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(|src| src.to_string())
        .or_else(|| img.value().attr("srcset").and_then(first_srcset_candidate))
}

fn first_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()
        .and_then(|candidate| candidate.split_whitespace().next())
        .map(|url| url.to_string())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemFields {
    pub name: String,
    pub description: String,
    pub price: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NameStrategy {
    /// First line that is neither a price, a rank nor boilerplate.
    #[default]
    FirstLine,
    /// Food keyword or CJK line, falling back to the second line.
    Keyword,
}

pub trait ItemParser: Send + Sync {
    fn parse_fields(&self, snapshot: &ItemSnapshot) -> Option<ItemFields>;
}

/// `boilerplate_prefixes` only applies to the first-line strategy.
pub fn parser_for(strategy: NameStrategy, boilerplate_prefixes: &[String]) -> Box<dyn ItemParser> {
    match strategy {
        NameStrategy::FirstLine => Box::new(FirstLineParser {
            rules: LineRules::new(boilerplate_prefixes),
        }),
        NameStrategy::Keyword => Box::new(KeywordParser {
            rules: LineRules::new(&KEYWORD_SKIPPED_PREFIXES.map(String::from)),
        }),
    }
}

/// Turns a snapshot into a menu item, or `None` when no name can be found.
pub fn build_menu_item(
    parser: &dyn ItemParser,
    validator: &ImageValidator,
    snapshot: &ItemSnapshot,
) -> Option<MenuItem> {
    let fields = parser.parse_fields(snapshot)?;
    if fields.name.trim().is_empty() {
        return None;
    }

    let image_url = snapshot
        .image_src
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let has_image = !image_url.is_empty();
    if !has_image {
        log::debug!("No image found for {}", fields.name);
    }
    let image_valid = has_image && validator.is_valid(&image_url);

    Some(MenuItem {
        name: fields.name,
        description: fields.description,
        price: fields.price,
        image_url,
        has_image,
        image_valid,
    })
}

#[derive(Debug, Clone)]
struct LineRules {
    boilerplate_prefixes: Vec<String>,
}

impl LineRules {
    fn new(boilerplate_prefixes: &[String]) -> Self {
        LineRules {
            boilerplate_prefixes: boilerplate_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    fn is_price_or_rank(line: &str) -> bool {
        line.starts_with('$') || line.starts_with('#')
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.boilerplate_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }

    fn price(lines: &[&str]) -> String {
        lines
            .iter()
            .find_map(|line| line.split_once('$'))
            .map(|(_, after)| after.split(&['$', '•'][..]).next().unwrap_or_default().trim())
            .filter(|amount| !amount.is_empty())
            .map(|amount| format!("${}", amount))
            .unwrap_or_default()
    }

    fn description(&self, lines: &[&str], name: &str) -> String {
        lines
            .iter()
            .filter(|line| {
                **line != name
                    && !Self::is_price_or_rank(line)
                    && !self.is_boilerplate(line)
                    && !line.trim_matches('•').trim().is_empty()
            })
            .copied()
            .collect::<Vec<&str>>()
            .join(DESCRIPTION_SEPARATOR)
    }

    fn fields(&self, lines: &[&str], name: &str) -> ItemFields {
        ItemFields {
            name: name.to_string(),
            description: self.description(lines, name),
            price: Self::price(lines),
        }
    }
}

pub struct FirstLineParser {
    rules: LineRules,
}

impl ItemParser for FirstLineParser {
    fn parse_fields(&self, snapshot: &ItemSnapshot) -> Option<ItemFields> {
        let lines = snapshot.lines();
        let name = lines
            .iter()
            .find(|line| !LineRules::is_price_or_rank(line) && !self.rules.is_boilerplate(line))?;

        Some(self.rules.fields(&lines, name))
    }
}

pub struct KeywordParser {
    rules: LineRules,
}

impl KeywordParser {
    fn looks_like_food(line: &str) -> bool {
        let lower = line.to_lowercase();
        FOOD_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
            || line.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
    }
}

impl ItemParser for KeywordParser {
    fn parse_fields(&self, snapshot: &ItemSnapshot) -> Option<ItemFields> {
        let lines = snapshot.lines();
        if lines.len() < 2 {
            return None;
        }

        let name = lines
            .iter()
            .find(|line| {
                !LineRules::is_price_or_rank(line)
                    && line.chars().count() > 3
                    && Self::looks_like_food(line)
            })
            .unwrap_or(&lines[1]);

        Some(self.rules.fields(&lines, name))
    }
}
