//! Journal entry aggregate and its state machine.
//!
//! ```text
//! Draft --post--> Posted --void--> Voided
//!                    |
//!                    +--> reversal entry (Draft, then posted immediately)
//! ```
//!
//! Transitions never go backward and never skip a state. Once posted, an
//! entry's content is sealed with a SHA-256 digest so later mutation can be
//! detected.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tally_shared::types::{ActorId, JournalEntryId, TenantId};

use super::numbering::EntryNumber;
use super::types::{EntryRequest, EntryStatus, EntryTotals, JournalLine, SourceRef};
use super::validation::EntryValidator;
use crate::error::LedgerError;

/// One atomic accounting transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry ID.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Assigned when the entry is posted.
    pub number: Option<EntryNumber>,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Originating business object.
    pub source: Option<SourceRef>,
    /// Lifecycle state.
    pub status: EntryStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Creator.
    pub created_by: ActorId,
    /// Posting time.
    pub posted_at: Option<DateTime<Utc>>,
    /// Who posted the entry.
    pub posted_by: Option<ActorId>,
    /// Void time.
    pub voided_at: Option<DateTime<Utc>>,
    /// Who voided the entry.
    pub voided_by: Option<ActorId>,
    /// Why the entry was voided.
    pub void_reason: Option<String>,
    /// On a reversal: the entry it reverses.
    pub reversal_of: Option<JournalEntryId>,
    /// On a voided entry: its reversal.
    pub reversed_by: Option<JournalEntryId>,
    /// Content digest recorded at posting.
    pub content_hash: Option<String>,
    /// Ordered lines.
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    /// Creates a draft from a validated request and its resolved lines.
    #[must_use]
    pub fn draft(
        tenant_id: TenantId,
        request: &EntryRequest,
        lines: Vec<JournalLine>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JournalEntryId::new(),
            tenant_id,
            number: None,
            entry_date: request.entry_date,
            description: request.description.trim().to_string(),
            reference: request.reference.clone(),
            source: request.source.clone(),
            status: EntryStatus::Draft,
            created_at: now,
            created_by: request.created_by,
            posted_at: None,
            posted_by: None,
            voided_at: None,
            voided_by: None,
            void_reason: None,
            reversal_of: None,
            reversed_by: None,
            content_hash: None,
            lines,
        }
    }

    /// Base-currency totals of the entry.
    pub fn totals(&self) -> Result<EntryTotals, LedgerError> {
        EntryTotals::of(&self.lines)
    }

    /// Checks that the entry is a draft that may be posted.
    pub fn check_can_post(&self) -> Result<(), LedgerError> {
        match self.status {
            EntryStatus::Draft => Ok(()),
            EntryStatus::Posted => Err(LedgerError::AlreadyPosted(self.id)),
            EntryStatus::Voided => Err(LedgerError::AlreadyVoided(self.id)),
        }
    }

    /// Checks that the entry is posted and may be voided.
    pub fn check_can_void(&self) -> Result<(), LedgerError> {
        match self.status {
            EntryStatus::Posted => Ok(()),
            EntryStatus::Draft | EntryStatus::Voided => Err(LedgerError::NotPosted(self.id)),
        }
    }

    /// Checks that the entry is a draft that may be discarded.
    pub fn check_can_discard(&self) -> Result<(), LedgerError> {
        if self.status == EntryStatus::Draft {
            Ok(())
        } else {
            Err(LedgerError::NotDraft(self.id))
        }
    }

    /// Posts the draft under `number`, sealing its content.
    ///
    /// # Errors
    ///
    /// - `AlreadyPosted` / `AlreadyVoided` if the entry is not a draft
    /// - `IntegrityAlarm` if the stored draft no longer balances
    pub fn post(
        &mut self,
        number: EntryNumber,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.check_can_post()?;

        if let Err(err) = self.totals().and_then(|totals| EntryValidator::check_totals(&totals)) {
            return Err(LedgerError::integrity(format!(
                "draft {} failed its balance check at posting: {err}",
                self.id
            )));
        }

        self.number = Some(number);
        self.status = EntryStatus::Posted;
        self.posted_at = Some(now);
        self.posted_by = Some(actor);
        self.content_hash = Some(self.content_digest());
        Ok(())
    }

    /// Builds the draft reversal of this posted entry.
    ///
    /// Lines are the originals with debit and credit swapped; accounts,
    /// magnitudes, currencies and rates are unchanged. The reversal is dated
    /// on the original's entry date.
    pub fn reversal(
        &self,
        actor: ActorId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        self.check_can_void()?;
        let reason = normalize_reason(reason)?;

        let number = self.number.as_ref().ok_or_else(|| {
            LedgerError::integrity(format!("posted entry {} has no entry number", self.id))
        })?;

        Ok(Self {
            id: JournalEntryId::new(),
            tenant_id: self.tenant_id,
            number: None,
            entry_date: self.entry_date,
            description: format!("Reversal of {number}: {reason}"),
            reference: Some(number.to_string()),
            source: Some(SourceRef::void_of(self.id)),
            status: EntryStatus::Draft,
            created_at: now,
            created_by: actor,
            posted_at: None,
            posted_by: None,
            voided_at: None,
            voided_by: None,
            void_reason: None,
            reversal_of: Some(self.id),
            reversed_by: None,
            content_hash: None,
            lines: self.lines.iter().map(JournalLine::swapped).collect(),
        })
    }

    /// Marks this posted entry voided by `reversal`.
    ///
    /// Only the void-transition fields change.
    pub fn mark_voided(
        &mut self,
        reversal: JournalEntryId,
        actor: ActorId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.check_can_void()?;
        let reason = normalize_reason(reason)?;

        self.status = EntryStatus::Voided;
        self.voided_at = Some(now);
        self.voided_by = Some(actor);
        self.void_reason = Some(reason);
        self.reversed_by = Some(reversal);
        Ok(())
    }

    /// SHA-256 over every field that is immutable once posted.
    ///
    /// Timestamps are excluded: storage truncates them. Decimals are
    /// normalized so a storage round trip does not change their text.
    #[must_use]
    pub fn content_digest(&self) -> String {
        const RECORD: char = '\u{1e}';

        let mut canonical = String::new();

        push_field(&mut canonical, &self.id.to_string());
        push_field(&mut canonical, &self.tenant_id.to_string());
        push_field(&mut canonical, &self.number.as_ref().map(ToString::to_string).unwrap_or_default());
        push_field(&mut canonical, &self.entry_date.to_string());
        push_field(&mut canonical, &self.description);
        push_field(&mut canonical, self.reference.as_deref().unwrap_or_default());
        push_field(&mut canonical, self.source.as_ref().map_or("", |s| s.source_type.as_str()));
        push_field(&mut canonical, self.source.as_ref().map_or("", |s| s.source_id.as_str()));
        push_field(&mut canonical, &self.created_by.to_string());
        push_field(&mut canonical, &self.posted_by.map(|a| a.to_string()).unwrap_or_default());
        push_field(&mut canonical, &self.reversal_of.map(|e| e.to_string()).unwrap_or_default());

        for line in &self.lines {
            push_field(&mut canonical, &line.line_no.to_string());
            push_field(&mut canonical, &line.account_id.to_string());
            push_field(&mut canonical, line.description.as_deref().unwrap_or_default());
            push_field(&mut canonical, &canonical_decimal(line.debit));
            push_field(&mut canonical, &canonical_decimal(line.credit));
            push_field(&mut canonical, line.currency.as_str());
            push_field(&mut canonical, &canonical_decimal(line.exchange_rate));
            push_field(&mut canonical, &canonical_decimal(line.base_debit));
            push_field(&mut canonical, &canonical_decimal(line.base_credit));
            canonical.push(RECORD);
        }

        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }

    /// Verifies that a posted or voided entry is still what was sealed.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityAlarm` if the digest is missing or differs, or if the
    /// lines no longer balance.
    pub fn verify_integrity(&self) -> Result<(), LedgerError> {
        if !self.status.affects_balances() {
            return Ok(());
        }

        match &self.content_hash {
            Some(recorded) if *recorded == self.content_digest() => {}
            Some(_) => {
                return Err(LedgerError::integrity(format!(
                    "posted entry {} does not match its recorded digest",
                    self.id
                )));
            }
            None => {
                return Err(LedgerError::integrity(format!(
                    "posted entry {} has no recorded digest",
                    self.id
                )));
            }
        }

        self.totals().and_then(|totals| EntryValidator::check_totals(&totals)).map_err(|err| {
            LedgerError::integrity(format!("posted entry {} is corrupt: {err}", self.id))
        })
    }
}

/// Appends `value` and a unit separator to the digest input.
fn push_field(buf: &mut String, value: &str) {
    buf.push_str(value);
    buf.push('\u{1f}');
}

fn normalize_reason(reason: &str) -> Result<String, LedgerError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::VoidReasonRequired);
    }
    Ok(trimmed.to_string())
}

fn canonical_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}
