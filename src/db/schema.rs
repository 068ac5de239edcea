use rusqlite::Connection;

/// Initialize the database schema. Idempotent.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Every contact-form submission, deduped or not
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            message TEXT,
            source TEXT NOT NULL DEFAULT 'website',
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email);

        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            business_name TEXT NOT NULL,
            email TEXT NOT NULL,
            category TEXT,
            message TEXT,
            score INTEGER NOT NULL DEFAULT 0,
            stage TEXT NOT NULL DEFAULT 'new'
                CHECK (stage IN ('new', 'contacted', 'contracted', 'closed_won', 'closed_lost')),
            review_status TEXT NOT NULL DEFAULT 'pending_review'
                CHECK (review_status IN ('pending_review', 'approved', 'rejected', 'edit_needed')),
            review_notes TEXT,
            reviewed_at INTEGER,
            proposal_sent_at INTEGER,
            proposal_message_id TEXT,
            payment_status TEXT NOT NULL DEFAULT 'none'
                CHECK (payment_status IN ('none', 'pending', 'deposit_paid', 'fully_paid')),
            payment_amount_cents INTEGER NOT NULL DEFAULT 0 CHECK (payment_amount_cents >= 0),
            follow_up_sent_at INTEGER,
            follow_up_message_id TEXT,
            closed_at INTEGER,
            send_error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_leads_email ON leads(email COLLATE NOCASE);
        CREATE INDEX IF NOT EXISTS idx_leads_created ON leads(created_at);
        CREATE INDEX IF NOT EXISTS idx_leads_follow_up ON leads(payment_status, proposal_sent_at)
            WHERE follow_up_sent_at IS NULL;

        -- (tier, link_type) -> hosted checkout link. Read-only at runtime.
        CREATE TABLE IF NOT EXISTS payment_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tier TEXT NOT NULL,
            link_type TEXT NOT NULL CHECK (link_type IN ('full', 'deposit', 'final')),
            stripe_product_id TEXT,
            stripe_price_id TEXT,
            stripe_link_id TEXT NOT NULL UNIQUE,
            stripe_url TEXT NOT NULL,
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_payment_links_active
            ON payment_links(tier, link_type) WHERE active = 1;

        CREATE TABLE IF NOT EXISTS proposals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL REFERENCES leads(id),
            tier TEXT NOT NULL,
            payment_url TEXT NOT NULL,
            message_id TEXT,
            sent_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_proposals_lead ON proposals(lead_id);

        -- Applied payments. One row per provider event, enforced here.
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL REFERENCES leads(id),
            stripe_event_id TEXT NOT NULL UNIQUE,
            payment_link_id INTEGER NOT NULL REFERENCES payment_links(id),
            tier TEXT NOT NULL,
            link_type TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            customer_email TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payments_lead ON payments(lead_id);

        -- Webhook delivery ledger (dedup gate)
        CREATE TABLE IF NOT EXISTS webhook_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stripe_event_id TEXT NOT NULL UNIQUE,
            event_type TEXT NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS follow_ups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL REFERENCES leads(id),
            message_id TEXT,
            sent_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_follow_ups_lead ON follow_ups(lead_id);

        CREATE TABLE IF NOT EXISTS activity_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            details TEXT NOT NULL,
            metadata TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_log(created_at);
        "#,
    )
}
