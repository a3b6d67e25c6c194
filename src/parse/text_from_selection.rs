use super::Error;
use scraper::{ElementRef, Selector};

/// Trimmed text of the first element under `element` matching `selector`.
///
/// Errors if nothing matches; the labels only feed the error message.
pub fn text_from_selection(
    selector: &Selector,
    element: ElementRef<'_>,
    parent_label: &str,
    child_label: &str,
) -> Result<String, Error> {
    let child = element
        .select(selector)
        .next() // first match
        .ok_or_else(|| {
            Error::HtmlParse(format!(
                "Every {parent_label} element should have a {child_label}."
            ))
        })?;
    Ok(get_inner_text(child))
}

/// All text nodes below `element` joined and trimmed.
///
/// Infoscreen cells mix `<br>`, `<b>` and plain text, so every text node is kept.
pub fn get_inner_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}
