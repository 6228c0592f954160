/// receipt intake - extractor reading to payment request
use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::approval::{ApprovalWorkflow, PendingTicket};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::state::LoanState;
use crate::store::LoanStore;
use crate::types::Identity;

pub const DEFAULT_AMOUNT_KEYWORDS: [&str; 4] = ["сумма", "итого", "total", "amount"];

/// what an extractor could read from a receipt; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptInfo {
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

pub trait ReceiptExtractor: Send + Sync {
    /// `Ok(None)` when nothing could be read
    fn extract(&self, image: &[u8]) -> Result<Option<ReceiptInfo>>;
}

/// keyword scan over recognised receipt text
#[derive(Debug, Clone)]
pub struct TextReceiptParser {
    keywords: Vec<String>,
}

impl Default for TextReceiptParser {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_AMOUNT_KEYWORDS)
    }
}

impl TextReceiptParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords<I, K>(keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn parse(&self, text: &str) -> Option<ReceiptInfo> {
        if text.trim().is_empty() {
            return None;
        }

        let mut info = ReceiptInfo {
            raw_text: Some(text.to_string()),
            ..ReceiptInfo::default()
        };

        for line in text.lines() {
            let line = line.trim().to_lowercase();

            if info.amount.is_none() && self.keywords.iter().any(|k| line.contains(k.as_str())) {
                info.amount = first_amount(&line);
            }

            if info.date.is_none() && looks_like_date(&line) {
                info.date = line
                    .split_whitespace()
                    .next()
                    .filter(|token| token.chars().any(|c| c.is_ascii_digit()))
                    .map(str::to_string);
            }
        }

        Some(info)
    }
}

impl ReceiptExtractor for TextReceiptParser {
    fn extract(&self, image: &[u8]) -> Result<Option<ReceiptInfo>> {
        Ok(self.parse(&String::from_utf8_lossy(image)))
    }
}

fn first_amount(line: &str) -> Option<Money> {
    let normalized = line.replace(',', ".");
    let mut tokens = normalized
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.'))
        .skip_while(|token| !is_number(token))
        .peekable();

    let mut amount = tokens.next()?.to_string();
    // "131 978.88": thousands written as space-separated groups
    if amount.len() <= 3 && !amount.contains('.') {
        while let Some(group) = tokens.next_if(|token| is_digit_group(token)) {
            amount.push_str(group);
            if group.contains('.') {
                break;
            }
        }
    }
    Money::from_str_exact(&amount).ok()
}

fn is_number(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && token.matches('.').count() <= 1
}

fn is_digit_group(token: &str) -> bool {
    let (whole, fraction) = token.split_once('.').unwrap_or((token, "0"));
    whole.len() == 3
        && whole.chars().all(|c| c.is_ascii_digit())
        && !fraction.is_empty()
        && fraction.chars().all(|c| c.is_ascii_digit())
}

fn looks_like_date(line: &str) -> bool {
    line.matches('.').count() == 2 || line.matches('/').count() == 2
}

/// receipt reading resolved to a month and amount
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptCandidate {
    pub receipt: ReceiptInfo,
    pub month: u32,
    pub amount: Money,
}

#[derive(Debug, Clone)]
pub struct ReceiptTicket {
    pub candidate: ReceiptCandidate,
    pub ticket: PendingTicket,
}

pub struct ReceiptIntake {
    extractor: Arc<dyn ReceiptExtractor>,
}

impl ReceiptIntake {
    pub fn new(extractor: Arc<dyn ReceiptExtractor>) -> Self {
        Self { extractor }
    }

    /// read the receipt and pick the month; `None` means the next unpaid one
    pub fn prepare(&self, state: &LoanState, image: &[u8], month: Option<u32>) -> Result<ReceiptCandidate> {
        let receipt = self.extractor.extract(image)?.ok_or(LedgerError::NoAmountDetected)?;
        let amount = receipt.amount.ok_or(LedgerError::NoAmountDetected)?;
        debug!("receipt amount {} (date {:?})", amount, receipt.date);

        let month = match month {
            Some(month) => month,
            None => state
                .ledger
                .next_unpaid_month(state.parameters.term_months)
                .ok_or(LedgerError::LoanFullyPaid)?,
        };

        Ok(ReceiptCandidate {
            receipt,
            month,
            amount,
        })
    }

    /// read the receipt and create a pending payment for its amount
    pub fn submit<S: LoanStore>(
        &self,
        workflow: &ApprovalWorkflow<S>,
        requester: Identity,
        image: &[u8],
        month: Option<u32>,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReceiptTicket> {
        let state = workflow.store().read()?;
        let candidate = self.prepare(&state, image, month)?;
        info!(
            "receipt from {} for month {}: {}",
            requester, candidate.month, candidate.amount
        );

        let ticket = workflow.create_request(requester, candidate.month, candidate.amount, time_provider)?;
        Ok(ReceiptTicket { candidate, ticket })
    }
}
