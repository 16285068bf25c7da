//! Predefined stock portfolios and CSV seeding.
//!
//! Three index-style portfolios ship with the service and are materialized
//! as `Ticker,Name` CSV files at startup. Personal portfolios are uploaded
//! by the user and live alongside the document uploads.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A predefined portfolio shipped with the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioKind {
    /// S&P 500 top holdings.
    Sp500,
    /// NASDAQ-100 top holdings.
    Nasdaq,
    /// Dow Jones Industrial Average top holdings.
    DowJones,
}

/// `Ticker,Name` rows for each predefined portfolio.
const SP500: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft"),
    ("AMZN", "Amazon"),
    ("NVDA", "Nvidia"),
    ("GOOGL", "Alphabet Inc. (Class A)"),
    ("TSLA", "Tesla Inc."),
    ("META", "Meta Platforms"),
    ("BRK.B", "Berkshire Hathaway"),
    ("JPM", "JPMorgan Chase"),
    ("JNJ", "Johnson & Johnson"),
];

const NASDAQ: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft"),
    ("AMZN", "Amazon"),
    ("NVDA", "Nvidia"),
    ("GOOGL", "Alphabet Inc. (Class A)"),
    ("META", "Meta Platforms"),
    ("TSLA", "Tesla Inc."),
    ("AVGO", "Broadcom"),
    ("COST", "Costco"),
    ("ADBE", "Adobe Inc."),
];

const DOWJONES: &[(&str, &str)] = &[
    ("AAPL", "Apple"),
    ("MSFT", "Microsoft"),
    ("AMZN", "Amazon"),
    ("NVDA", "Nvidia"),
    ("JPM", "JPMorgan Chase"),
    ("JNJ", "Johnson & Johnson"),
    ("V", "Visa Inc."),
    ("WMT", "Walmart"),
    ("PG", "Procter & Gamble"),
    ("UNH", "UnitedHealth Group"),
];

impl PortfolioKind {
    /// All predefined portfolios.
    pub const ALL: &'static [PortfolioKind] =
        &[Self::Sp500, Self::Nasdaq, Self::DowJones];

    /// Identifier used in API requests and CSV file names.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Sp500 => "sp500",
            Self::Nasdaq => "nasdaq",
            Self::DowJones => "dowjones",
        }
    }

    /// Human-readable label shown in responses and prompts.
    #[must_use]
    pub fn label(self) -> String {
        format!("{} Portfolio", self.slug().to_uppercase())
    }

    /// The `(ticker, name)` holdings of this portfolio.
    #[must_use]
    pub fn holdings(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Sp500 => SP500,
            Self::Nasdaq => NASDAQ,
            Self::DowJones => DOWJONES,
        }
    }

    /// Ticker symbols only, for prompt construction.
    #[must_use]
    pub fn tickers(self) -> Vec<&'static str> {
        self.holdings().iter().map(|(ticker, _)| *ticker).collect()
    }

    /// CSV file path for this portfolio under the given directory.
    #[must_use]
    pub fn csv_path(self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.csv", self.slug()))
    }

    /// Render the portfolio as `Ticker,Name` CSV content.
    #[must_use]
    pub fn to_csv(self) -> String {
        let mut out = String::from("Ticker,Name\n");
        for (ticker, name) in self.holdings() {
            out.push_str(ticker);
            out.push(',');
            out.push_str(name);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for PortfolioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PortfolioKind {
    type Err = UnknownPortfolio;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sp500" => Ok(Self::Sp500),
            "nasdaq" => Ok(Self::Nasdaq),
            "dowjones" => Ok(Self::DowJones),
            other => Err(UnknownPortfolio(other.to_string())),
        }
    }
}

/// Error for an unrecognized portfolio identifier.
#[derive(Debug, thiserror::Error)]
#[error("unknown portfolio: {0}")]
pub struct UnknownPortfolio(pub String);

/// The portfolio a session is analyzing against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortfolioSelection {
    /// One of the predefined index portfolios.
    Predefined(PortfolioKind),
    /// A user-uploaded portfolio file.
    Personal {
        /// Path to the uploaded portfolio file.
        path: PathBuf,
        /// Original filename, for display.
        filename: String,
    },
}

impl PortfolioSelection {
    /// Display label used in prompts and responses.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Predefined(kind) => kind.label(),
            Self::Personal { filename, .. } => format!("Personal Portfolio: {filename}"),
        }
    }

    /// The stock blurb added to prompts for predefined portfolios.
    ///
    /// Personal portfolios have no static ticker list, so this is empty
    /// for them.
    #[must_use]
    pub fn stock_summary(&self) -> Option<String> {
        match self {
            Self::Predefined(kind) => Some(format!(
                "The {} portfolio contains stocks like: {} and others.",
                kind.slug().to_uppercase(),
                kind.tickers().join(", ")
            )),
            Self::Personal { .. } => None,
        }
    }
}

/// Create the predefined portfolio CSV files under `dir` if absent.
///
/// Existing files are left alone so a locally edited portfolio survives
/// restarts.
pub fn seed_portfolio_files(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for kind in PortfolioKind::ALL {
        let path = kind.csv_path(dir);
        if !path.exists() {
            std::fs::write(&path, kind.to_csv())?;
            tracing::info!(
                name: "portfolio.seeded",
                portfolio = %kind,
                path = %path.display(),
                "Created portfolio file"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_slug_round_trip() {
        for kind in PortfolioKind::ALL {
            assert_eq!(kind.slug().parse::<PortfolioKind>().unwrap(), *kind);
        }
        assert!("personal-portfolio".parse::<PortfolioKind>().is_err());
    }

    #[test]
    fn test_csv_content() {
        let csv = PortfolioKind::Sp500.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Ticker,Name"));
        assert_eq!(lines.next(), Some("AAPL,Apple Inc."));
        assert_eq!(csv.lines().count(), 11);
    }

    #[test]
    fn test_seed_creates_all_files() {
        let dir = TempDir::new().unwrap();
        seed_portfolio_files(dir.path()).unwrap();

        for kind in PortfolioKind::ALL {
            assert!(kind.csv_path(dir.path()).exists());
        }
    }

    #[test]
    fn test_seed_preserves_existing() {
        let dir = TempDir::new().unwrap();
        let path = PortfolioKind::Nasdaq.csv_path(dir.path());
        std::fs::write(&path, "Ticker,Name\nCUSTOM,Custom Corp\n").unwrap();

        seed_portfolio_files(dir.path()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("CUSTOM"));
    }

    #[test]
    fn test_stock_summary() {
        let selection = PortfolioSelection::Predefined(PortfolioKind::DowJones);
        let summary = selection.stock_summary().unwrap();
        assert!(summary.contains("DOWJONES"));
        assert!(summary.contains("AAPL"));

        let personal = PortfolioSelection::Personal {
            path: PathBuf::from("/tmp/p.csv"),
            filename: "p.csv".into(),
        };
        assert!(personal.stock_summary().is_none());
        assert_eq!(personal.label(), "Personal Portfolio: p.csv");
    }
}
