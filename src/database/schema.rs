//! Schema registry: table naming and the column layout of every kanban entity.

use chrono::{Local, Utc};

/// Value stored in date columns that were never set.
pub const UNSET_DATE: &str = "0000-00-00 00:00:00";

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compose the physical table name for a logical entity.
///
/// With a board id the board-scoped card table name is produced and `logical_name` is ignored.
/// The caller validates that `board_id` is positive.
pub fn table_name(prefix: &str, logical_name: &str, board_id: Option<i64>) -> String {
    match board_id {
        Some(id) => format!("{}wpnakama_board_{}_cards", prefix, id),
        None => format!("{}{}", prefix, logical_name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Workspace,
    Board,
    BoardAccess,
    Phase,
    CardTable,
    Card,
    Task,
    TasksList,
    Surface,
    Setting,
}

impl Entity {
    pub const ALL: [Entity; 10] = [
        Entity::Workspace,
        Entity::Board,
        Entity::BoardAccess,
        Entity::Phase,
        Entity::CardTable,
        Entity::Card,
        Entity::Task,
        Entity::TasksList,
        Entity::Surface,
        Entity::Setting,
    ];

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Entity::Workspace => &WORKSPACES,
            Entity::Board => &BOARDS,
            Entity::BoardAccess => &BOARDS_ACCESS,
            Entity::Phase => &PHASES,
            Entity::CardTable => &CARD_TABLES,
            Entity::Card => &CARDS,
            Entity::Task => &TASKS,
            Entity::TasksList => &TASKSLISTS,
            Entity::Surface => &SURFACES,
            Entity::Setting => &OPTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Int => "BIGINT",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    None,
    /// Auto-increment surrogate key
    Generated,
    /// Caller-supplied primary key
    Natural,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub key: KeyKind,
    pub unique: bool,
    /// SQL literal used as the column default
    pub default: &'static str,
}

impl Column {
    pub const fn int(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Int, key: KeyKind::None, unique: false, default: "0" }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text, key: KeyKind::None, unique: false, default: "''" }
    }

    pub const fn date(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text, key: KeyKind::None, unique: false, default: "'0000-00-00 00:00:00'" }
    }

    pub const fn id(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Int, key: KeyKind::Generated, unique: false, default: "" }
    }

    pub const fn primary(self) -> Self {
        Self { key: KeyKind::Natural, ..self }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Local,
    Utc,
}

impl Clock {
    pub fn now(&self) -> String {
        match self {
            Clock::Local => Local::now().format(DATE_FORMAT).to_string(),
            Clock::Utc => Utc::now().format(DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub field: &'static str,
    pub clock: Clock,
}

/// Columns the store fills with the current time on insert and on update.
#[derive(Debug, Clone, Copy)]
pub struct TimestampFields {
    pub on_insert: &'static [Stamp],
    pub on_update: &'static [Stamp],
}

impl TimestampFields {
    pub const NONE: TimestampFields = TimestampFields { on_insert: &[], on_update: &[] };
}

#[derive(Debug)]
pub struct EntitySchema {
    pub entity: Entity,
    pub logical: &'static str,
    pub key: &'static str,
    pub columns: &'static [Column],
    pub timestamps: TimestampFields,
    pub indexes: &'static [&'static str],
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn key_is_generated(&self) -> bool {
        self.column(self.key).is_some_and(|c| c.key == KeyKind::Generated)
    }

    pub fn table_name(&self, prefix: &str) -> String {
        table_name(prefix, self.logical, None)
    }
}

static WORKSPACES: EntitySchema = EntitySchema {
    entity: Entity::Workspace,
    logical: "wpnakama_workspaces",
    key: "workspace_id",
    columns: &[Column::id("workspace_id"), Column::text("title"), Column::text("description")],
    timestamps: TimestampFields::NONE,
    indexes: &[],
};

static BOARDS: EntitySchema = EntitySchema {
    entity: Entity::Board,
    logical: "wpnakama_boards",
    key: "board_id",
    columns: &[
        Column::id("board_id"),
        Column::text("title"),
        Column::text("description"),
        Column::date("board_date"),
        Column::date("board_date_gmt"),
        Column::date("start_date"),
        Column::date("end_date"),
        Column::int("workspace_id"),
    ],
    timestamps: TimestampFields {
        on_insert: &[
            Stamp { field: "board_date", clock: Clock::Local },
            Stamp { field: "board_date_gmt", clock: Clock::Utc },
        ],
        on_update: &[],
    },
    indexes: &["workspace_id"],
};

static BOARDS_ACCESS: EntitySchema = EntitySchema {
    entity: Entity::BoardAccess,
    logical: "wpnakama_boards_access",
    key: "id",
    columns: &[Column::id("id"), Column::int("board_id").unique(), Column::text("access_value")],
    timestamps: TimestampFields::NONE,
    indexes: &[],
};

static PHASES: EntitySchema = EntitySchema {
    entity: Entity::Phase,
    logical: "wpnakama_phases",
    key: "phase_id",
    columns: &[
        Column::id("phase_id"),
        Column::int("board_id"),
        Column::text("title"),
        Column::int("position"),
    ],
    timestamps: TimestampFields::NONE,
    indexes: &["board_id"],
};

static CARD_TABLES: EntitySchema = EntitySchema {
    entity: Entity::CardTable,
    logical: "wpnakama_card_tables",
    key: "board_id",
    columns: &[Column::int("board_id").primary(), Column::text("table_name")],
    timestamps: TimestampFields::NONE,
    indexes: &[],
};

static CARDS: EntitySchema = EntitySchema {
    entity: Entity::Card,
    logical: "wpnakama_cards",
    key: "card_id",
    columns: &[
        Column::id("card_id"),
        Column::int("board_id"),
        Column::text("title"),
        Column::text("notes"),
        Column::date("card_date"),
        Column::date("card_date_gmt"),
        Column::date("card_modify_date"),
        Column::date("card_deadline_date"),
        Column::int("phase_id"),
        Column::text("post_ids"),
        Column::int("position"),
        Column::int("is_completed"),
    ],
    timestamps: TimestampFields {
        on_insert: &[
            Stamp { field: "card_date", clock: Clock::Local },
            Stamp { field: "card_date_gmt", clock: Clock::Utc },
            Stamp { field: "card_modify_date", clock: Clock::Local },
        ],
        on_update: &[Stamp { field: "card_modify_date", clock: Clock::Local }],
    },
    indexes: &["board_id", "phase_id"],
};

static TASKS: EntitySchema = EntitySchema {
    entity: Entity::Task,
    logical: "wpnakama_tasks",
    key: "task_id",
    columns: &[
        Column::id("task_id"),
        Column::text("content"),
        Column::int("board_id"),
        Column::int("card_id"),
        Column::int("user_id"),
        Column::int("position"),
        Column::int("is_completed"),
    ],
    timestamps: TimestampFields::NONE,
    indexes: &["board_id", "card_id"],
};

static TASKSLISTS: EntitySchema = EntitySchema {
    entity: Entity::TasksList,
    logical: "wpnakama_taskslists",
    key: "taskslist_id",
    columns: &[Column::id("taskslist_id"), Column::text("title"), Column::text("tasks")],
    timestamps: TimestampFields::NONE,
    indexes: &[],
};

static SURFACES: EntitySchema = EntitySchema {
    entity: Entity::Surface,
    logical: "wpnakama_surfaces",
    key: "surface_id",
    columns: &[
        Column::id("surface_id"),
        Column::int("board_id"),
        Column::text("title"),
        Column::text("slug").unique(),
        Column::text("status"),
        Column::date("publish_date"),
    ],
    timestamps: TimestampFields::NONE,
    indexes: &["board_id"],
};

static OPTIONS: EntitySchema = EntitySchema {
    entity: Entity::Setting,
    logical: "wpnakama_options",
    key: "option_name",
    columns: &[Column::text("option_name").primary(), Column::text("option_value")],
    timestamps: TimestampFields::NONE,
    indexes: &[],
};
