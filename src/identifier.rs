//! Image identifier parsing. Detail-page URLs end in `&image=<identifier>.jpg`, where the
//! identifier is four hyphen-separated position tokens followed by a part suffix.

use crate::scraper::ScraperError;

const IMAGE_PARAM: &str = "&image=";
const RANGE_TOKENS: usize = 4;
const PART_TOKEN_LEN: usize = 3;

/// Range and part derived from one image identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub range: String,
    pub part: String,
}

/// Bare identifier: the text after the last `&image=`, cut at the first `.`.
pub fn bare_identifier(url: &str) -> &str {
    let tail = url.rsplit(IMAGE_PARAM).next().unwrap_or(url);
    tail.split('.').next().unwrap_or(tail)
}

/// Parse range and part from a detail-page URL.
///
/// `range` is the first four tokens joined with `-`. `part` is the last token when it is
/// exactly three characters long, otherwise the last two tokens joined with `-`.
pub fn parse_identifier(url: &str) -> Result<Identifier, ScraperError> {
    let identifier = bare_identifier(url);
    let tokens: Vec<&str> = identifier.split('-').collect();
    if tokens.len() < RANGE_TOKENS {
        return Err(ScraperError::MalformedIdentifier {
            input: url.to_string(),
            tokens: tokens.len(),
        });
    }
    let range = tokens[..RANGE_TOKENS].join("-");
    let last = tokens[tokens.len() - 1];
    let part = if last.chars().count() == PART_TOKEN_LEN {
        last.to_string()
    } else {
        format!("{}-{}", tokens[tokens.len() - 2], last)
    };
    Ok(Identifier { range, part })
}

/// Scan the href's hyphen tokens (up to `.jpg`) and return the first token whose
/// successor is exactly three characters long.
pub fn find_range(href: &str) -> Option<String> {
    let stem = href.split(".jpg").next().unwrap_or(href);
    let tokens: Vec<&str> = stem.split('-').collect();
    tokens
        .windows(2)
        .find(|pair| pair[1].chars().count() == PART_TOKEN_LEN)
        .map(|pair| pair[0].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str =
        "https://cervantes.library.tamu.edu/dqiDisplayInterface/displayMidImage.jsp?edition=374&image=";

    #[test]
    fn three_char_suffix_is_the_part() -> Result<(), ScraperError> {
        let id = parse_identifier(&format!("{}1605-mad-cue-t01-a01.jpg", DETAIL))?;
        assert_eq!(id.range, "1605-mad-cue-t01");
        assert_eq!(id.part, "a01");
        Ok(())
    }

    #[test]
    fn longer_suffix_takes_two_tokens() -> Result<(), ScraperError> {
        let id = parse_identifier(&format!("{}A-B-C-D-EF-GHIJ.jpg", DETAIL))?;
        assert_eq!(id.range, "A-B-C-D");
        assert_eq!(id.part, "EF-GHIJ");
        Ok(())
    }

    #[test]
    fn two_char_suffix_takes_two_tokens() -> Result<(), ScraperError> {
        let id = parse_identifier("x&image=A-B-C-D-EF-GH.jpg")?;
        assert_eq!(id.part, "EF-GH");
        Ok(())
    }

    #[test]
    fn last_image_param_wins() {
        assert_eq!(
            bare_identifier("a.jsp?x=1&image=old-1&image=A-B-C-D-XYZ.jpg"),
            "A-B-C-D-XYZ"
        );
    }

    #[test]
    fn too_few_tokens_is_malformed() {
        let result = parse_identifier("displayMidImage.jsp?edition=1&image=A-B-C.jpg");
        match result {
            Err(ScraperError::MalformedIdentifier { tokens, .. }) => assert_eq!(tokens, 3),
            other => panic!("expected MalformedIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn missing_image_param_is_malformed() {
        assert!(parse_identifier("https://cervantes.library.tamu.edu/page.jsp").is_err());
    }

    #[test]
    fn find_range_returns_token_before_three_char_token() {
        assert_eq!(
            find_range("displayMidImage.jsp?edition=374&image=1605-0001-abc-t01.jpg"),
            Some("0001".to_string())
        );
    }

    #[test]
    fn find_range_none_without_three_char_token() {
        assert_eq!(find_range("a-bb-cccc.jpg"), None);
        assert_eq!(find_range("nohyphens.jpg"), None);
    }
}
