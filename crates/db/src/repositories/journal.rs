//! Journal entry persistence.
//!
//! This is the only code in the workspace that writes `journal_entries`,
//! `journal_lines` or `entry_sequences`. State transitions are decided by
//! [`JournalEntry`] in the core; this repository locks, numbers and stores
//! the result.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement,
};
use tally_core::LedgerError;
use tally_core::ledger::{EntryNumber, JournalEntry, JournalLine, SourceRef};
use tally_shared::types::{AccountId, ActorId, Currency, JournalEntryId, JournalLineId, TenantId};
use uuid::Uuid;

use crate::entities::{journal_entries, journal_lines};
use crate::error::storage;
use crate::tenant::TenantScope;

/// Reserves the next entry sequence value for a tenant.
///
/// The upsert takes a row lock on the tenant's counter, so concurrent posts
/// of one tenant serialize here until their transactions end.
const RESERVE_SEQUENCE_SQL: &str = r"
INSERT INTO entry_sequences (tenant_id, last_value)
VALUES ($1, 1)
ON CONFLICT (tenant_id)
DO UPDATE SET last_value = entry_sequences.last_value + 1
RETURNING last_value
";

/// Result of voiding an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidOutcome {
    /// The original entry, now voided.
    pub original: JournalEntry,
    /// The posted reversal.
    pub reversal: JournalEntry,
}

/// Journal entry repository.
#[derive(Debug, Clone, Copy)]
pub struct JournalRepository {
    number_width: usize,
}

impl JournalRepository {
    /// Creates a repository formatting entry numbers to `number_width` digits.
    #[must_use]
    pub const fn new(number_width: usize) -> Self {
        Self { number_width }
    }

    /// Stores a draft and its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if an insert fails.
    pub async fn insert_draft(&self, scope: &TenantScope, entry: &JournalEntry) -> Result<(), LedgerError> {
        ensure_tenant(scope, entry)?;

        journal_entries::ActiveModel {
            id: Set(entry.id.into_inner()),
            tenant_id: Set(scope.tenant_uuid()),
            entry_sequence: Set(None),
            entry_number: Set(None),
            entry_date: Set(entry.entry_date),
            description: Set(entry.description.clone()),
            reference: Set(entry.reference.clone()),
            source_type: Set(entry.source.as_ref().map(|s| s.source_type.clone())),
            source_id: Set(entry.source.as_ref().map(|s| s.source_id.clone())),
            status: Set(entry.status.into()),
            created_at: Set(entry.created_at.fixed_offset()),
            created_by: Set(entry.created_by.into_inner()),
            reversal_of: Set(entry.reversal_of.map(JournalEntryId::into_inner)),
            ..Default::default()
        }
        .insert(scope.conn())
        .await
        .map_err(storage)?;

        let lines: Vec<journal_lines::ActiveModel> = entry
            .lines
            .iter()
            .map(|line| journal_lines::ActiveModel {
                id: Set(line.id.into_inner()),
                tenant_id: Set(scope.tenant_uuid()),
                entry_id: Set(entry.id.into_inner()),
                line_no: Set(i32::try_from(line.line_no).unwrap_or(i32::MAX)),
                account_id: Set(line.account_id.into_inner()),
                description: Set(line.description.clone()),
                debit: Set(line.debit),
                credit: Set(line.credit),
                currency: Set(line.currency.as_str().to_string()),
                exchange_rate: Set(line.exchange_rate),
                base_debit: Set(line.base_debit),
                base_credit: Set(line.base_credit),
            })
            .collect();

        if !lines.is_empty() {
            journal_lines::Entity::insert_many(lines)
                .exec(scope.conn())
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    /// Gets an entry with its ordered lines.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the tenant has no such entry
    /// - `IntegrityAlarm` if a stored row cannot be read back into the domain
    pub async fn get(&self, scope: &TenantScope, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let model = journal_entries::Entity::find_by_id(id.into_inner())
            .filter(journal_entries::Column::TenantId.eq(scope.tenant_uuid()))
            .one(scope.conn())
            .await
            .map_err(storage)?
            .ok_or(LedgerError::EntryNotFound(id))?;

        self.hydrate(scope, model).await
    }

    /// Posts a draft: locks it, reserves its number and seals it.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the tenant has no such entry
    /// - `AlreadyPosted` / `AlreadyVoided` if the entry is not a draft
    pub async fn post(
        &self,
        scope: &TenantScope,
        id: JournalEntryId,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, LedgerError> {
        let mut entry = self.lock(scope, id).await?;
        entry.check_can_post()?;
        self.post_locked(scope, &mut entry, actor, now).await?;
        Ok(entry)
    }

    /// Voids a posted entry by posting its reversal.
    ///
    /// The reversal is inserted as a draft, posted, and linked to the
    /// original, which is then marked voided; all on the scope's transaction.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the tenant has no such entry
    /// - `NotPosted` if the entry is a draft or already voided
    /// - `VoidReasonRequired` if the reason is blank
    pub async fn void(
        &self,
        scope: &TenantScope,
        id: JournalEntryId,
        actor: ActorId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<VoidOutcome, LedgerError> {
        let mut original = self.lock(scope, id).await?;
        let mut reversal = original.reversal(actor, reason, now)?;

        self.insert_draft(scope, &reversal).await?;
        self.post_locked(scope, &mut reversal, actor, now).await?;

        original.mark_voided(reversal.id, actor, reason, now)?;
        journal_entries::ActiveModel {
            id: Set(original.id.into_inner()),
            status: Set(original.status.into()),
            voided_at: Set(original.voided_at.map(|t| t.fixed_offset())),
            voided_by: Set(original.voided_by.map(ActorId::into_inner)),
            void_reason: Set(original.void_reason.clone()),
            reversed_by: Set(original.reversed_by.map(JournalEntryId::into_inner)),
            ..Default::default()
        }
        .update(scope.conn())
        .await
        .map_err(storage)?;

        Ok(VoidOutcome { original, reversal })
    }

    /// Deletes a draft and its lines.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the tenant has no such entry
    /// - `NotDraft` if the entry has been posted
    pub async fn discard(&self, scope: &TenantScope, id: JournalEntryId) -> Result<(), LedgerError> {
        let entry = self.lock(scope, id).await?;
        entry.check_can_discard()?;

        journal_entries::Entity::delete_many()
            .filter(journal_entries::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(journal_entries::Column::Id.eq(id.into_inner()))
            .exec(scope.conn())
            .await
            .map_err(storage)?;
        Ok(())
    }

    /// Reserves the next number, seals `entry` and stores the posting fields.
    async fn post_locked(
        &self,
        scope: &TenantScope,
        entry: &mut JournalEntry,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let sequence = reserve_sequence(scope).await?;
        let number = EntryNumber::new(&scope.tenant().entry_prefix, sequence, self.number_width);
        entry.post(number, actor, now)?;

        journal_entries::ActiveModel {
            id: Set(entry.id.into_inner()),
            status: Set(entry.status.into()),
            entry_sequence: Set(Some(sequence)),
            entry_number: Set(entry.number.as_ref().map(ToString::to_string)),
            posted_at: Set(entry.posted_at.map(|t| t.fixed_offset())),
            posted_by: Set(entry.posted_by.map(ActorId::into_inner)),
            content_hash: Set(entry.content_hash.clone()),
            ..Default::default()
        }
        .update(scope.conn())
        .await
        .map_err(storage)?;
        Ok(())
    }

    /// Loads an entry under `SELECT ... FOR UPDATE`.
    async fn lock(&self, scope: &TenantScope, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let model = journal_entries::Entity::find_by_id(id.into_inner())
            .filter(journal_entries::Column::TenantId.eq(scope.tenant_uuid()))
            .lock_exclusive()
            .one(scope.conn())
            .await
            .map_err(storage)?
            .ok_or(LedgerError::EntryNotFound(id))?;

        self.hydrate(scope, model).await
    }

    async fn hydrate(
        &self,
        scope: &TenantScope,
        model: journal_entries::Model,
    ) -> Result<JournalEntry, LedgerError> {
        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(journal_lines::Column::EntryId.eq(model.id))
            .order_by_asc(journal_lines::Column::LineNo)
            .all(scope.conn())
            .await
            .map_err(storage)?;

        to_entry(model, lines)
    }
}

fn ensure_tenant(scope: &TenantScope, entry: &JournalEntry) -> Result<(), LedgerError> {
    if entry.tenant_id == scope.tenant_id() {
        return Ok(());
    }
    Err(LedgerError::integrity(format!(
        "entry {} of tenant {} written through the scope of tenant {}",
        entry.id,
        entry.tenant_id,
        scope.tenant_id()
    )))
}

async fn reserve_sequence(scope: &TenantScope) -> Result<i64, LedgerError> {
    let row = scope
        .conn()
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            RESERVE_SEQUENCE_SQL,
            [scope.tenant_uuid().into()],
        ))
        .await
        .map_err(storage)?
        .ok_or_else(|| LedgerError::integrity("entry sequence reservation returned no row"))?;

    row.try_get::<i64>("", "last_value").map_err(storage)
}

/// Recovers a stored number such as `JE-00042`.
fn stored_number(formatted: &str) -> Option<EntryNumber> {
    let (prefix, _) = formatted.rsplit_once('-')?;
    EntryNumber::parse(formatted, prefix)
}

fn to_entry(
    model: journal_entries::Model,
    lines: Vec<journal_lines::Model>,
) -> Result<JournalEntry, LedgerError> {
    let corrupt = |what: &str| LedgerError::integrity(format!("journal entry {} has {what}", model.id));

    let number = match &model.entry_number {
        Some(formatted) => Some(stored_number(formatted).ok_or_else(|| corrupt("a malformed entry number"))?),
        None => None,
    };
    let source = match (&model.source_type, &model.source_id) {
        (Some(source_type), Some(source_id)) => Some(SourceRef::new(source_type, source_id)),
        _ => None,
    };

    let lines = lines
        .into_iter()
        .map(|line| {
            Ok(JournalLine {
                id: JournalLineId::from_uuid(line.id),
                line_no: u32::try_from(line.line_no).map_err(|_| corrupt("a negative line number"))?,
                account_id: AccountId::from_uuid(line.account_id),
                description: line.description,
                debit: line.debit,
                credit: line.credit,
                currency: Currency::new(&line.currency).map_err(|_| corrupt("a malformed line currency"))?,
                exchange_rate: line.exchange_rate,
                base_debit: line.base_debit,
                base_credit: line.base_credit,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(JournalEntry {
        id: JournalEntryId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        number,
        entry_date: model.entry_date,
        description: model.description,
        reference: model.reference,
        source,
        status: model.status.into(),
        created_at: model.created_at.with_timezone(&Utc),
        created_by: ActorId::from_uuid(model.created_by),
        posted_at: model.posted_at.map(|t| t.with_timezone(&Utc)),
        posted_by: model.posted_by.map(ActorId::from_uuid),
        voided_at: model.voided_at.map(|t| t.with_timezone(&Utc)),
        voided_by: model.voided_by.map(ActorId::from_uuid),
        void_reason: model.void_reason,
        reversal_of: model.reversal_of.map(JournalEntryId::from_uuid),
        reversed_by: model.reversed_by.map(JournalEntryId::from_uuid),
        content_hash: model.content_hash,
        lines,
    })
}
