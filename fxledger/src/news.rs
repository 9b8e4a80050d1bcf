use chrono::{DateTime, SubsecRound, Utc};
use serde::Deserialize;

use crate::errors::LedgerError;

const FX_KEYWORDS: &[&str] = &[
    "forex", "currency", "central bank", "rate hike", "rate cut", "inflation", "interest rate",
    "dollar", "euro", "yen", "pound", "usd", "eur", "jpy", "gbp", "market", "bond", "fed", "ecb",
    "boj", "boe",
];

/// One cleaned news article. `label`/`confidence` are only present when an
/// external model already scored the article.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl NewsItem {
    pub fn new(title: &str, description: &str, published_at: DateTime<Utc>) -> Self {
        NewsItem {
            title: title.to_string(),
            description: description.to_string(),
            published_at,
            label: None,
            confidence: None,
        }
    }

    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description).trim().to_lowercase()
    }

    pub fn is_fx_related(&self) -> bool {
        let text = self.text();
        FX_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    }
}

/// Reads the cleaned-news CSV produced by the news collector.
pub struct CsvNewsSource {
    path: String,
}

impl CsvNewsSource {
    pub fn new(path: &str) -> Self {
        CsvNewsSource { path: path.to_string() }
    }

    // FX-related items in publication order. Rows that do not deserialize are skipped.
    pub fn fetch(&self) -> Result<Vec<NewsItem>, LedgerError> {
        if !std::path::Path::new(&self.path).exists() {
            log::warn!("News file {} does not exist yet", self.path);
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let mut items = Vec::new();
        for (i, result) in reader.deserialize::<NewsItem>().enumerate() {
            match result {
                // Ledger timestamps carry whole seconds, so the news side must too
                Ok(mut item) if item.is_fx_related() => {
                    item.published_at = item.published_at.trunc_subsecs(0);
                    items.push(item);
                }
                Ok(_) => {}
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => log::warn!("Skipping news row {}: {}", i + 2, err),
            }
        }

        items.sort_by_key(|item| item.published_at);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn filters_non_fx_items() {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        assert!(NewsItem::new("ECB holds rates", "", at).is_fx_related());
        assert!(!NewsItem::new("Local team wins cup", "A great night", at).is_fx_related());
    }

    #[test]
    fn reads_news_csv_in_publication_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "title,description,published_at,label,confidence").unwrap();
        writeln!(file, "Yen slides,BoJ stays dovish,2024-03-05T10:00:00Z,negative,0.91").unwrap();
        writeln!(file, "EUR rallies,ECB hawkish,2024-03-04T10:00:00.750Z,,").unwrap();
        writeln!(file, "Gardening tips,Roses,2024-03-04T11:00:00Z,,").unwrap();
        writeln!(file, "USD bad row,no timestamp,yesterday,,").unwrap();
        drop(file);

        let items = CsvNewsSource::new(path.to_str().unwrap()).fetch().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "EUR rallies");
        assert_eq!(items[0].label, None);
        assert_eq!(items[0].published_at, Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
        assert_eq!(items[1].label.as_deref(), Some("negative"));
        assert_eq!(items[1].confidence, Some(0.91));
    }

    #[test]
    fn missing_news_file_is_empty() {
        let items = CsvNewsSource::new("/nonexistent/news.csv").fetch().unwrap();
        assert!(items.is_empty());
    }
}
