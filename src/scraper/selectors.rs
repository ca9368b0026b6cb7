//! Every DOM selector the portal scrape depends on.

use thirtyfour::By;

use super::extractor::SummaryLayout;

pub const EMAIL_INPUT: &str = ".testEmailInput";
pub const PASSWORD_INPUT: &str = ".testPasswordInput";
pub const SIGN_IN_BUTTON: &str = ".testSignInButton";

/// Rows scanned on both the summary and detail views.
pub const TABLE_ROWS: &str = "table tr";
/// Present once a detail table has data rows.
pub const TABLE_DATA_CELL: &str = "table tr td";

pub const SUMMARY_PATH_MARKER: &str = "RoutesSummary";

pub fn email_input() -> By {
    By::Css(EMAIL_INPUT)
}

pub fn password_input() -> By {
    By::Css(PASSWORD_INPUT)
}

pub fn sign_in_button() -> By {
    By::Css(SIGN_IN_BUTTON)
}

pub fn table_data_cell() -> By {
    By::Css(TABLE_DATA_CELL)
}

/// Quotes `text` as an XPath 1.0 string literal.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text.split('\'').map(|part| format!("'{part}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// XPath 1.0 `normalize-space` leaves U+00A0 alone, so fold it to a plain
/// space first to match `Route::normalized_name`.
const NODE_TEXT: &str = "normalize-space(translate(., '\u{a0}', ' '))";

/// Candidate links for a route's detail view, most specific first:
/// the missing-count cell of the route's row, a link named after the route,
/// then any link inside a cell mentioning it.
///
/// `route_name` is expected in `Route::normalized_name` form.
pub fn route_link_candidates(route_name: &str, layout: &SummaryLayout) -> Vec<String> {
    let name = xpath_literal(route_name);
    vec![
        format!(
            "//table//tr[td[{}][{NODE_TEXT}={name}]]/td[{}]//a",
            layout.name_column + 1,
            layout.count_column + 1,
        ),
        format!("//a[{NODE_TEXT}={name}]"),
        format!("//td[contains({NODE_TEXT}, {name})]//a"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpath_literal_quoting() {
        assert_eq!(xpath_literal("Rt 305"), "'Rt 305'");
        assert_eq!(xpath_literal("O'Hare"), "\"O'Hare\"");
        assert_eq!(
            xpath_literal(r#"Rt "A" O'Hare"#),
            r#"concat('Rt "A" O', "'", 'Hare')"#
        );
    }

    #[test]
    fn count_link_targets_layout_columns() {
        let candidates = route_link_candidates("Rt 305", &SummaryLayout::default());
        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[0],
            "//table//tr[td[2][normalize-space(translate(., '\u{a0}', ' '))='Rt 305']]/td[5]//a"
        );
        assert_eq!(
            candidates[1],
            "//a[normalize-space(translate(., '\u{a0}', ' '))='Rt 305']"
        );
    }

    #[test]
    fn candidates_fold_non_breaking_spaces_on_the_page_side() {
        let route = crate::models::Route::new("Rt\u{a0}305", 4);
        let candidates = route_link_candidates(&route.normalized_name(), &SummaryLayout::default());

        // The literal is plain-space; every node test folds NBSP before comparing.
        for xpath in &candidates {
            assert!(xpath.contains("'Rt 305'"), "{xpath}");
            assert!(!xpath.contains("normalize-space(.)"), "{xpath}");
            assert!(xpath.contains("translate(., '\u{a0}', ' ')"), "{xpath}");
        }
    }
}
