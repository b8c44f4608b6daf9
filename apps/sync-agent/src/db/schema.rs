//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the local replica database.
pub const SCHEMA: &str = r#"
-- File metadata; blobs live in blob storage under `path`
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    path TEXT NOT NULL DEFAULT '',
    content_type TEXT NOT NULL,
    thumbnail TEXT,
    global_file_id INTEGER,
    checksum TEXT,
    owner_kind TEXT,
    owner_id INTEGER,
    created_at TEXT NOT NULL
);

-- Mirrored reference data (local id == global id)
CREATE TABLE IF NOT EXISTS languages (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    rtl INTEGER NOT NULL DEFAULT 0,
    auto_translated INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY,
    key TEXT NOT NULL,
    value TEXT NOT NULL DEFAULT '{}',
    platform TEXT NOT NULL DEFAULT '',
    auto_translated TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '{}',
    type TEXT NOT NULL,
    parent_id INTEGER,
    auto_translated TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS health_conditions (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '{}',
    parent_id INTEGER,
    auto_translated TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS assistive_technologies (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '{}',
    description TEXT NOT NULL DEFAULT '{}',
    file_id INTEGER
);

CREATE TABLE IF NOT EXISTS faqs (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '{}',
    content TEXT NOT NULL DEFAULT '{}',
    display_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tutorials (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '{}',
    content TEXT NOT NULL DEFAULT '{}',
    platform TEXT NOT NULL DEFAULT ''
);

-- Content shared between local authors and the global library
CREATE TABLE IF NOT EXISTS exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '{}',
    sets INTEGER NOT NULL DEFAULT 0,
    reps INTEGER NOT NULL DEFAULT 0,
    include_feedback INTEGER NOT NULL DEFAULT 0,
    get_pain_level INTEGER NOT NULL DEFAULT 0,
    additional_fields TEXT NOT NULL DEFAULT '[]',
    therapist_id INTEGER,
    is_global INTEGER NOT NULL DEFAULT 0,
    global_ref INTEGER,
    auto_translated TEXT NOT NULL DEFAULT '{}',
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS exercise_files (
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    file_id INTEGER NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (exercise_id, file_id)
);

CREATE TABLE IF NOT EXISTS education_materials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '{}',
    file_ids TEXT NOT NULL DEFAULT '{}',
    therapist_id INTEGER,
    is_global INTEGER NOT NULL DEFAULT 0,
    global_ref INTEGER,
    auto_translated TEXT NOT NULL DEFAULT '{}',
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS questionnaires (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '{}',
    description TEXT NOT NULL DEFAULT '{}',
    therapist_id INTEGER,
    is_global INTEGER NOT NULL DEFAULT 0,
    global_ref INTEGER,
    auto_translated TEXT NOT NULL DEFAULT '{}',
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS questionnaire_questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    questionnaire_id INTEGER NOT NULL REFERENCES questionnaires(id) ON DELETE CASCADE,
    global_ref INTEGER,
    title TEXT NOT NULL DEFAULT '{}',
    question_type TEXT NOT NULL DEFAULT '',
    mandatory INTEGER NOT NULL DEFAULT 0,
    file_id INTEGER,
    display_order INTEGER NOT NULL DEFAULT 0,
    UNIQUE (questionnaire_id, global_ref)
);

CREATE TABLE IF NOT EXISTS questionnaire_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id INTEGER NOT NULL REFERENCES questionnaire_questions(id) ON DELETE CASCADE,
    global_ref INTEGER,
    description TEXT NOT NULL DEFAULT '{}',
    value REAL,
    threshold REAL,
    display_order INTEGER NOT NULL DEFAULT 0,
    UNIQUE (question_id, global_ref)
);

-- Screening questionnaire tree (mirrored at every level)
CREATE TABLE IF NOT EXISTS screening_questionnaires (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '{}',
    description TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS screening_sections (
    id INTEGER PRIMARY KEY,
    questionnaire_id INTEGER NOT NULL REFERENCES screening_questionnaires(id) ON DELETE CASCADE,
    title TEXT NOT NULL DEFAULT '{}',
    description TEXT NOT NULL DEFAULT '{}',
    display_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS screening_questions (
    id INTEGER PRIMARY KEY,
    section_id INTEGER NOT NULL REFERENCES screening_sections(id) ON DELETE CASCADE,
    title TEXT NOT NULL DEFAULT '{}',
    question_type TEXT NOT NULL DEFAULT '',
    mandatory INTEGER NOT NULL DEFAULT 0,
    file_id INTEGER,
    display_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS screening_options (
    id INTEGER PRIMARY KEY,
    question_id INTEGER NOT NULL REFERENCES screening_questions(id) ON DELETE CASCADE,
    option_text TEXT NOT NULL DEFAULT '{}',
    option_point REAL,
    threshold REAL,
    min_value REAL,
    max_value REAL,
    file_id INTEGER,
    display_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS screening_logics (
    id INTEGER PRIMARY KEY,
    question_id INTEGER NOT NULL REFERENCES screening_questions(id) ON DELETE CASCADE,
    target_question_id INTEGER,
    target_option_id INTEGER,
    target_option_value TEXT,
    condition_type TEXT NOT NULL DEFAULT '',
    condition_rule TEXT NOT NULL DEFAULT ''
);

-- Content to category links
CREATE TABLE IF NOT EXISTS content_categories (
    content_type TEXT NOT NULL,
    content_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    PRIMARY KEY (content_type, content_id, category_id)
);

-- One row per family run
CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    family TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL DEFAULT 'running',
    created INTEGER NOT NULL DEFAULT 0,
    updated INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    error TEXT
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner_kind, owner_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_exercises_global_ref
    ON exercises(global_ref) WHERE is_global = 1;
CREATE UNIQUE INDEX IF NOT EXISTS idx_education_materials_global_ref
    ON education_materials(global_ref) WHERE is_global = 1;
CREATE UNIQUE INDEX IF NOT EXISTS idx_questionnaires_global_ref
    ON questionnaires(global_ref) WHERE is_global = 1;
CREATE INDEX IF NOT EXISTS idx_screening_sections_parent ON screening_sections(questionnaire_id);
CREATE INDEX IF NOT EXISTS idx_screening_questions_parent ON screening_questions(section_id);
CREATE INDEX IF NOT EXISTS idx_screening_options_parent ON screening_options(question_id);
CREATE INDEX IF NOT EXISTS idx_screening_logics_parent ON screening_logics(question_id);
CREATE INDEX IF NOT EXISTS idx_sync_runs_family ON sync_runs(family, started_at);
"#;

/// Record the schema version if not present.
pub const INIT_SCHEMA_VERSION: &str = r#"
INSERT OR IGNORE INTO schema_version (version) VALUES (1);
"#;
