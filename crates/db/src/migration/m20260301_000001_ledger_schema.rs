//! Ledger schema.
//!
//! Creates tenants, chart of accounts, journal and tax-rate tables together
//! with the storage-level guards (immutability triggers, deferred balance
//! check, overlap exclusion) and row-level security policies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: EXTENSIONS & ENUMS
        // ============================================================
        db.execute_unprepared(EXTENSIONS_SQL).await?;
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS & CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;
        db.execute_unprepared(ENTRY_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 4: TAX RATES
        // ============================================================
        db.execute_unprepared(TAX_RATES_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 6: ROW-LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const EXTENSIONS_SQL: &str = r"
-- Needed for the tax-rate overlap exclusion constraint
CREATE EXTENSION IF NOT EXISTS btree_gist;
";

const ENUMS_SQL: &str = r"
-- Account types (closed taxonomy)
CREATE TYPE account_type AS ENUM (
    'asset',
    'liability',
    'equity',
    'revenue',
    'expense'
);

-- Journal entry lifecycle
CREATE TYPE entry_status AS ENUM ('draft', 'posted', 'voided');
";

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    base_currency CHAR(3) NOT NULL,
    entry_prefix VARCHAR(10) NOT NULL DEFAULT 'JE',
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_tenants_base_currency CHECK (base_currency ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_tenants_entry_prefix CHECK (entry_prefix ~ '^[A-Za-z0-9]{1,10}$')
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    parent_id UUID,
    is_active BOOLEAN NOT NULL DEFAULT true,
    is_system BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_tenant_code UNIQUE (tenant_id, code),
    CONSTRAINT uq_accounts_tenant_id UNIQUE (tenant_id, id),
    -- A parent always lives in the same tenant
    CONSTRAINT fk_accounts_parent FOREIGN KEY (tenant_id, parent_id)
        REFERENCES accounts(tenant_id, id),
    CONSTRAINT chk_accounts_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX idx_accounts_tenant_type ON accounts(tenant_id, account_type);
CREATE INDEX idx_accounts_parent ON accounts(tenant_id, parent_id) WHERE parent_id IS NOT NULL;
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    entry_sequence BIGINT,
    entry_number VARCHAR(40),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference VARCHAR(100),
    source_type VARCHAR(50),
    source_id VARCHAR(100),
    status entry_status NOT NULL DEFAULT 'draft',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    posted_at TIMESTAMPTZ,
    posted_by UUID,
    voided_at TIMESTAMPTZ,
    voided_by UUID,
    void_reason TEXT,
    reversal_of UUID,
    reversed_by UUID,
    content_hash CHAR(64),
    CONSTRAINT uq_journal_entries_tenant_id UNIQUE (tenant_id, id),
    CONSTRAINT uq_journal_entries_sequence UNIQUE (tenant_id, entry_sequence),
    CONSTRAINT fk_journal_entries_reversal_of FOREIGN KEY (tenant_id, reversal_of)
        REFERENCES journal_entries(tenant_id, id),
    CONSTRAINT fk_journal_entries_reversed_by FOREIGN KEY (tenant_id, reversed_by)
        REFERENCES journal_entries(tenant_id, id),
    CONSTRAINT chk_journal_entries_description CHECK (btrim(description) <> ''),
    CONSTRAINT chk_journal_entries_source CHECK ((source_type IS NULL) = (source_id IS NULL)),
    CONSTRAINT chk_journal_entries_draft CHECK (
        status <> 'draft' OR (
            entry_sequence IS NULL AND entry_number IS NULL
            AND posted_at IS NULL AND posted_by IS NULL AND content_hash IS NULL
        )
    ),
    CONSTRAINT chk_journal_entries_posted CHECK (
        status = 'draft' OR (
            entry_sequence IS NOT NULL AND entry_sequence > 0 AND entry_number IS NOT NULL
            AND posted_at IS NOT NULL AND posted_by IS NOT NULL AND content_hash IS NOT NULL
        )
    ),
    CONSTRAINT chk_journal_entries_voided CHECK (
        status = 'voided' OR (
            voided_at IS NULL AND voided_by IS NULL AND void_reason IS NULL AND reversed_by IS NULL
        )
    ),
    CONSTRAINT chk_journal_entries_void_fields CHECK (
        status <> 'voided' OR (
            voided_at IS NOT NULL AND voided_by IS NOT NULL
            AND void_reason IS NOT NULL AND btrim(void_reason) <> '' AND reversed_by IS NOT NULL
        )
    )
);

CREATE INDEX idx_journal_entries_tenant_date ON journal_entries(tenant_id, entry_date);
CREATE INDEX idx_journal_entries_tenant_status ON journal_entries(tenant_id, status);
CREATE INDEX idx_journal_entries_source ON journal_entries(tenant_id, source_type, source_id)
    WHERE source_type IS NOT NULL;
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    entry_id UUID NOT NULL,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL,
    description TEXT,
    debit NUMERIC(28, 10) NOT NULL DEFAULT 0,
    credit NUMERIC(28, 10) NOT NULL DEFAULT 0,
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(28, 12) NOT NULL DEFAULT 1,
    base_debit NUMERIC(28, 10) NOT NULL DEFAULT 0,
    base_credit NUMERIC(28, 10) NOT NULL DEFAULT 0,
    CONSTRAINT fk_journal_lines_entry FOREIGN KEY (tenant_id, entry_id)
        REFERENCES journal_entries(tenant_id, id) ON DELETE CASCADE,
    CONSTRAINT fk_journal_lines_account FOREIGN KEY (tenant_id, account_id)
        REFERENCES accounts(tenant_id, id),
    CONSTRAINT uq_journal_lines_entry_line UNIQUE (entry_id, line_no),
    CONSTRAINT chk_journal_lines_line_no CHECK (line_no > 0),
    CONSTRAINT chk_journal_lines_one_side CHECK (
        (debit > 0 AND credit = 0) OR (debit = 0 AND credit > 0)
    ),
    CONSTRAINT chk_journal_lines_base_side CHECK (
        (debit > 0 AND base_debit >= 0 AND base_credit = 0)
        OR (credit > 0 AND base_credit >= 0 AND base_debit = 0)
    ),
    CONSTRAINT chk_journal_lines_rate CHECK (exchange_rate > 0),
    CONSTRAINT chk_journal_lines_currency CHECK (currency ~ '^[A-Z]{3}$')
);

CREATE INDEX idx_journal_lines_entry ON journal_lines(entry_id);
CREATE INDEX idx_journal_lines_account ON journal_lines(tenant_id, account_id);
";

const ENTRY_SEQUENCES_SQL: &str = r"
-- One counter row per tenant; reserving a number takes its row lock
CREATE TABLE entry_sequences (
    tenant_id UUID PRIMARY KEY REFERENCES tenants(id),
    last_value BIGINT NOT NULL,
    CONSTRAINT chk_entry_sequences_positive CHECK (last_value > 0)
);
";

const TAX_RATES_SQL: &str = r"
CREATE TABLE tax_rates (
    id UUID PRIMARY KEY,
    tenant_id UUID REFERENCES tenants(id),
    jurisdiction VARCHAR(20) NOT NULL,
    category VARCHAR(50) NOT NULL,
    rate NUMERIC(28, 12) NOT NULL,
    valid_from DATE NOT NULL,
    valid_to DATE,
    account_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT fk_tax_rates_account FOREIGN KEY (tenant_id, account_id)
        REFERENCES accounts(tenant_id, id),
    CONSTRAINT chk_tax_rates_rate CHECK (rate >= 0),
    CONSTRAINT chk_tax_rates_interval CHECK (valid_to IS NULL OR valid_to > valid_from),
    -- Global defaults carry no posting account
    CONSTRAINT chk_tax_rates_global_account CHECK (tenant_id IS NOT NULL OR account_id IS NULL),
    CONSTRAINT ex_tax_rates_overlap EXCLUDE USING gist (
        COALESCE(tenant_id, '00000000-0000-0000-0000-000000000000'::UUID) WITH =,
        jurisdiction WITH =,
        category WITH =,
        daterange(valid_from, valid_to, '[)') WITH &&
    )
);

CREATE INDEX idx_tax_rates_lookup ON tax_rates(jurisdiction, category, valid_from);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_account_type_change
-- The type fixes the sign convention of every historical balance
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_account_type_change()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.account_type IS DISTINCT FROM OLD.account_type THEN
        RAISE EXCEPTION 'account % type cannot change', OLD.code;
    END IF;
    IF NEW.tenant_id IS DISTINCT FROM OLD.tenant_id THEN
        RAISE EXCEPTION 'account % cannot move between tenants', OLD.code;
    END IF;
    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_accounts_guard
BEFORE UPDATE ON accounts
FOR EACH ROW
EXECUTE FUNCTION prevent_account_type_change();

-- ============================================================
-- FUNCTION: guard_journal_entry
-- Drafts may post; posted entries may only void; voided entries are frozen
-- ============================================================
CREATE OR REPLACE FUNCTION guard_journal_entry()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        IF OLD.status <> 'draft' THEN
            RAISE EXCEPTION 'journal entry % is % and cannot be deleted', OLD.id, OLD.status;
        END IF;
        RETURN OLD;
    END IF;

    IF NEW.id <> OLD.id OR NEW.tenant_id <> OLD.tenant_id THEN
        RAISE EXCEPTION 'journal entry % cannot be re-keyed', OLD.id;
    END IF;

    IF OLD.status = 'draft' THEN
        IF NEW.status = 'voided' THEN
            RAISE EXCEPTION 'draft % cannot be voided', OLD.id;
        END IF;
        RETURN NEW;
    END IF;

    IF OLD.status = 'voided' THEN
        RAISE EXCEPTION 'journal entry % is voided and immutable', OLD.id;
    END IF;

    -- OLD.status = 'posted'
    IF NEW.status <> 'voided' THEN
        RAISE EXCEPTION 'journal entry % is posted and immutable; void it instead', OLD.id;
    END IF;

    IF (NEW.entry_sequence, NEW.entry_number, NEW.entry_date, NEW.description, NEW.reference,
        NEW.source_type, NEW.source_id, NEW.created_at, NEW.created_by, NEW.posted_at,
        NEW.posted_by, NEW.reversal_of, NEW.content_hash)
       IS DISTINCT FROM
       (OLD.entry_sequence, OLD.entry_number, OLD.entry_date, OLD.description, OLD.reference,
        OLD.source_type, OLD.source_id, OLD.created_at, OLD.created_by, OLD.posted_at,
        OLD.posted_by, OLD.reversal_of, OLD.content_hash) THEN
        RAISE EXCEPTION 'voiding journal entry % may only set the void fields', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_journal_entries_guard
BEFORE UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION guard_journal_entry();

-- ============================================================
-- FUNCTION: guard_journal_line
-- Lines change only while their entry is a draft
-- ============================================================
CREATE OR REPLACE FUNCTION guard_journal_line()
RETURNS TRIGGER AS $$
DECLARE
    parent_status entry_status;
BEGIN
    IF TG_OP = 'INSERT' THEN
        SELECT status INTO parent_status FROM journal_entries WHERE id = NEW.entry_id;
    ELSE
        SELECT status INTO parent_status FROM journal_entries WHERE id = OLD.entry_id;
    END IF;

    IF TG_OP = 'UPDATE' AND NEW.entry_id <> OLD.entry_id THEN
        RAISE EXCEPTION 'journal line % cannot move between entries', OLD.id;
    END IF;

    -- A missing parent means a draft delete is cascading
    IF parent_status IS NOT NULL AND parent_status <> 'draft' THEN
        RAISE EXCEPTION 'lines of % journal entry are immutable', parent_status;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_journal_lines_guard
BEFORE INSERT OR UPDATE OR DELETE ON journal_lines
FOR EACH ROW
EXECUTE FUNCTION guard_journal_line();

-- ============================================================
-- FUNCTION: check_entry_balance
-- Every stored entry balances in base currency and moves value
-- ============================================================
CREATE OR REPLACE FUNCTION check_entry_balance()
RETURNS TRIGGER AS $$
DECLARE
    target UUID;
    total_debit NUMERIC;
    total_credit NUMERIC;
    line_count BIGINT;
BEGIN
    IF TG_OP = 'DELETE' THEN
        target := OLD.entry_id;
    ELSE
        target := NEW.entry_id;
    END IF;

    IF NOT EXISTS (SELECT 1 FROM journal_entries WHERE id = target) THEN
        RETURN NULL;
    END IF;

    SELECT COALESCE(SUM(base_debit), 0), COALESCE(SUM(base_credit), 0), COUNT(*)
    INTO total_debit, total_credit, line_count
    FROM journal_lines
    WHERE entry_id = target;

    IF line_count = 0 OR total_debit <> total_credit OR total_debit <= 0 THEN
        RAISE EXCEPTION 'journal entry % does not balance: debits %, credits %',
            target, total_debit, total_credit
            USING ERRCODE = 'check_violation';
    END IF;

    RETURN NULL;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_journal_lines_balance
AFTER INSERT OR UPDATE OR DELETE ON journal_lines
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_entry_balance();

-- ============================================================
-- FUNCTION: guard_tax_rate
-- Historical rates are never deleted, only closed once
-- ============================================================
CREATE OR REPLACE FUNCTION guard_tax_rate()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        RAISE EXCEPTION 'tax rate % cannot be deleted; close it instead', OLD.id;
    END IF;

    IF OLD.valid_to IS NOT NULL OR NEW.valid_to IS NULL THEN
        RAISE EXCEPTION 'tax rate % can only be closed once', OLD.id;
    END IF;

    IF (NEW.id, NEW.tenant_id, NEW.jurisdiction, NEW.category, NEW.rate, NEW.valid_from,
        NEW.account_id, NEW.created_at)
       IS DISTINCT FROM
       (OLD.id, OLD.tenant_id, OLD.jurisdiction, OLD.category, OLD.rate, OLD.valid_from,
        OLD.account_id, OLD.created_at) THEN
        RAISE EXCEPTION 'closing tax rate % may only set valid_to', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_tax_rates_guard
BEFORE UPDATE OR DELETE ON tax_rates
FOR EACH ROW
EXECUTE FUNCTION guard_tax_rate();
";

const RLS_SQL: &str = r"
-- ============================================================
-- ROW-LEVEL SECURITY POLICIES
-- The application sets the tenant per transaction:
--   SELECT set_config('app.current_tenant_id', '<uuid>', true);
-- ============================================================

CREATE OR REPLACE FUNCTION current_tenant_id()
RETURNS UUID AS $$
    SELECT NULLIF(current_setting('app.current_tenant_id', true), '')::UUID
$$ LANGUAGE sql STABLE;

ALTER TABLE tenants ENABLE ROW LEVEL SECURITY;
ALTER TABLE accounts ENABLE ROW LEVEL SECURITY;
ALTER TABLE journal_entries ENABLE ROW LEVEL SECURITY;
ALTER TABLE journal_lines ENABLE ROW LEVEL SECURITY;
ALTER TABLE entry_sequences ENABLE ROW LEVEL SECURITY;
ALTER TABLE tax_rates ENABLE ROW LEVEL SECURITY;

CREATE POLICY tenant_isolation ON tenants
    USING (id = current_tenant_id());

CREATE POLICY tenant_isolation ON accounts
    USING (tenant_id = current_tenant_id());

CREATE POLICY tenant_isolation ON journal_entries
    USING (tenant_id = current_tenant_id());

CREATE POLICY tenant_isolation ON journal_lines
    USING (tenant_id = current_tenant_id());

CREATE POLICY tenant_isolation ON entry_sequences
    USING (tenant_id = current_tenant_id());

-- Global defaults are visible to every tenant but writable only without a tenant scope
CREATE POLICY tax_rates_read ON tax_rates FOR SELECT
    USING (tenant_id IS NULL OR tenant_id = current_tenant_id());

CREATE POLICY tax_rates_insert ON tax_rates FOR INSERT
    WITH CHECK (
        tenant_id = current_tenant_id()
        OR (tenant_id IS NULL AND current_tenant_id() IS NULL)
    );

CREATE POLICY tax_rates_update ON tax_rates FOR UPDATE
    USING (
        tenant_id = current_tenant_id()
        OR (tenant_id IS NULL AND current_tenant_id() IS NULL)
    );
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- ============================================================

DROP TRIGGER IF EXISTS trg_tax_rates_guard ON tax_rates;
DROP TRIGGER IF EXISTS trg_journal_lines_balance ON journal_lines;
DROP TRIGGER IF EXISTS trg_journal_lines_guard ON journal_lines;
DROP TRIGGER IF EXISTS trg_journal_entries_guard ON journal_entries;
DROP TRIGGER IF EXISTS trg_accounts_guard ON accounts;

DROP FUNCTION IF EXISTS guard_tax_rate();
DROP FUNCTION IF EXISTS check_entry_balance();
DROP FUNCTION IF EXISTS guard_journal_line();
DROP FUNCTION IF EXISTS guard_journal_entry();
DROP FUNCTION IF EXISTS prevent_account_type_change();

DROP TABLE IF EXISTS tax_rates CASCADE;
DROP TABLE IF EXISTS entry_sequences CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS tenants CASCADE;

DROP FUNCTION IF EXISTS current_tenant_id();

DROP TYPE IF EXISTS entry_status CASCADE;
DROP TYPE IF EXISTS account_type CASCADE;
";
