use crate::model::{KeywordSourcePair, Opportunity};

/// Every (keyword, paragraph) match on one page.
///
/// Pairs whose source is the page itself are skipped. Matching is
/// case-insensitive substring containment, one opportunity per matching
/// paragraph however often the keyword occurs in it. Output is ordered by
/// pair, then by paragraph.
pub fn find_opportunities(
    target_url: &str,
    paragraphs: &[String],
    pairs: &[KeywordSourcePair],
) -> Vec<Opportunity> {
    let lowered: Vec<String> = paragraphs.iter().map(|p| p.to_lowercase()).collect();
    let mut opportunities = Vec::new();

    for pair in pairs {
        if pair.source_url == target_url || pair.keyword.is_empty() {
            continue;
        }
        let keyword = pair.keyword.to_lowercase();

        for (paragraph, lower) in paragraphs.iter().zip(&lowered) {
            if !lower.is_empty() && lower.contains(&keyword) {
                opportunities.push(Opportunity {
                    keyword: pair.keyword.clone(),
                    paragraph_text: paragraph.clone(),
                    target_url: target_url.to_string(),
                    source_url: pair.source_url.clone(),
                });
            }
        }
    }

    opportunities
}
