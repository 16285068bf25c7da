//! Prompt construction for the analysis agent.
//!
//! All prompts ask for markdown with `##` section headers so the browser
//! UI can render responses directly.

use std::fmt;
use std::str::FromStr;

use crate::portfolio::PortfolioSelection;

/// System instruction attached to every agent call.
pub const ANALYST_INSTRUCTIONS: &str = "You are a financial analyst specializing in portfolio \
impact analysis. Analyze documents for their potential effects on stock portfolios, considering \
sectors, individual companies, market trends, and risk factors. Provide actionable insights for \
investors. Use clear section headers (## for main sections, ### for subsections), bullet points, \
and bold text for important terms.";

/// The canned follow-up prompts exposed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Historical context and comparisons.
    Historical,
    /// Future projections and forecasts.
    Forecast,
    /// Risk mitigation and solutions.
    Solutions,
}

impl FromStr for PromptKind {
    type Err = UnknownPrompt;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "historical" => Ok(Self::Historical),
            "forecast" => Ok(Self::Forecast),
            "solutions" => Ok(Self::Solutions),
            other => Err(UnknownPrompt(other.to_string())),
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Historical => "historical",
            Self::Forecast => "forecast",
            Self::Solutions => "solutions",
        })
    }
}

/// Error for an unrecognized predefined prompt type.
#[derive(Debug, thiserror::Error)]
#[error("invalid prompt type: {0}")]
pub struct UnknownPrompt(pub String);

fn stock_blurb(portfolio: &PortfolioSelection) -> String {
    portfolio.stock_summary().unwrap_or_default()
}

/// Build the main document analysis prompt for `/api/summarize`.
#[must_use]
pub fn analysis_prompt(portfolio: &PortfolioSelection, user_input: &str) -> String {
    format!(
        "\nAnalyze the provided financial document and assess its potential impact on {context}.\n\
\n\
{stocks}\n\
\n\
Please provide a well-structured analysis with the following sections:\n\
\n\
## Key Findings from the Document\n\
- Summarize the main points\n\
- Focus on financial/regulatory implications\n\
- Use bullet points for clarity\n\
\n\
## Sector & Company-Specific Impacts Analysis\n\
- Break down by industry sectors (Technology, Healthcare, Financials, Energy, etc.)\n\
- Identify winners and losers in each sector\n\
- Mention specific ticker symbols from the portfolio\n\
- Use **bold** for company names and tickers (e.g., **AAPL**)\n\
- Quantify potential effects where possible\n\
- Provide specific examples\n\
\n\
## Overall Portfolio Assessment\n\
- Net expected impact on portfolio value\n\
- Risk level assessment (Low/Medium/High)\n\
- Timeframe considerations (Short-term vs Long-term)\n\
- Portfolio diversification implications\n\
\n\
## Disclaimer\n\
- Standard investment disclaimer about consulting financial advisors\n\
- Note that this is analysis, not financial advice\n\
- Market conditions may change rapidly\n\
\n\
Please use clear section headers (## for main sections), bullet points, and proper formatting \
for readability. Focus on actionable insights for portfolio management.\n\
\n\
{user_input}\n",
        context = portfolio.label(),
        stocks = stock_blurb(portfolio),
    )
}

/// Build the follow-up chat prompt for `/api/chat`.
#[must_use]
pub fn chat_prompt(portfolio: &PortfolioSelection, user_input: &str) -> String {
    format!(
        "Regarding the document analysis and {}: {user_input}",
        portfolio.label()
    )
}

/// Build one of the canned follow-up prompts for `/api/predefined_prompt`.
#[must_use]
pub fn predefined_prompt(kind: PromptKind, portfolio: &PortfolioSelection) -> String {
    let context = portfolio.label();
    let stocks = stock_blurb(portfolio);

    match kind {
        PromptKind::Historical => format!(
            "## Historical Context & Comparisons\n\n\
Provide historical context and comparisons for how similar documents/events have impacted \
{context}. {stocks}\n\n\
- Analyze patterns from past market reactions\n\
- Compare with similar regulatory/legislative events\n\
- Identify lessons learned from historical precedents\n\
- Timeframe analysis (short-term vs long-term effects)\n\n\
Please use clear section headers and bullet points."
        ),
        PromptKind::Forecast => format!(
            "## Future Projections & Forecasts\n\n\
Based on the document analysis, provide forecasts and future projections for {context}. \
{stocks}\n\n\
- Key indicators to watch\n\
- Potential market movements and timing\n\
- Sector-specific outlook\n\
- Risk factors in the forecast\n\
- Recommended monitoring timeline\n\n\
Please structure with clear sections, actionable insights."
        ),
        PromptKind::Solutions => format!(
            "## Risk Mitigation & Solutions\n\n\
Analyze risks identified in the document and suggest specific risk mitigation strategies for \
{context}. {stocks}\n\n\
- Portfolio adjustment recommendations\n\
- Hedging strategies\n\
- Diversification opportunities\n\
- Monitoring and alert triggers\n\
- Contingency planning\n\
- Apply Buy-Hold-Sell analysis for any stocks or sectors that are at risk after taking all the \
preceding into account.\n\n\
- Remember, be concise and use bullet points."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::PortfolioKind;

    fn sp500() -> PortfolioSelection {
        PortfolioSelection::Predefined(PortfolioKind::Sp500)
    }

    #[test]
    fn test_prompt_kind_parsing() {
        assert_eq!("historical".parse::<PromptKind>().unwrap(), PromptKind::Historical);
        assert_eq!("forecast".parse::<PromptKind>().unwrap(), PromptKind::Forecast);
        assert_eq!("solutions".parse::<PromptKind>().unwrap(), PromptKind::Solutions);
        assert!("other".parse::<PromptKind>().is_err());
    }

    #[test]
    fn test_analysis_prompt_mentions_portfolio_and_stocks() {
        let prompt = analysis_prompt(&sp500(), "Focus on tech.");
        assert!(prompt.contains("SP500 Portfolio"));
        assert!(prompt.contains("AAPL"));
        assert!(prompt.contains("## Key Findings from the Document"));
        assert!(prompt.contains("## Disclaimer"));
        assert!(prompt.contains("Focus on tech."));
    }

    #[test]
    fn test_chat_prompt_includes_context() {
        let prompt = chat_prompt(&sp500(), "What about energy?");
        assert!(prompt.starts_with("Regarding the document analysis and SP500 Portfolio:"));
        assert!(prompt.ends_with("What about energy?"));
    }

    #[test]
    fn test_predefined_prompts_have_headers() {
        assert!(predefined_prompt(PromptKind::Historical, &sp500())
            .starts_with("## Historical Context & Comparisons"));
        assert!(predefined_prompt(PromptKind::Forecast, &sp500())
            .starts_with("## Future Projections & Forecasts"));
        assert!(predefined_prompt(PromptKind::Solutions, &sp500())
            .starts_with("## Risk Mitigation & Solutions"));
    }
}
