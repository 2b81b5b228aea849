//! Database schema definitions
//!
//! Constants for table and column names used with rusqlite. Column
//! constants are listed in the fixed row order of each table.

/// Groups table schema
pub mod groups {
    /// Table name
    pub const TABLE: &str = "groups";
    /// Primary key column
    pub const GROUP_ID: &str = "group_id";
    /// Unique external key column
    pub const SCREEN_NAME: &str = "screen_name";
    /// Display name column
    pub const NAME: &str = "name";
    /// Subscriber count column
    pub const MEMBERS_COUNT: &str = "members_count";
}

/// Posts table schema
pub mod posts {
    /// Table name
    pub const TABLE: &str = "posts";
    /// Primary key column
    pub const POST_ID: &str = "post_id";
    /// Owning group screen name column
    pub const GROUP: &str = "\"group\"";
    /// Publication timestamp column
    pub const DATE: &str = "date";
    /// Title column
    pub const TITLE: &str = "title";
    /// Body column
    pub const TEXT: &str = "text";
    /// Likes counter column
    pub const LIKES_COUNT: &str = "likes_count";
    /// Views counter column
    pub const VIEWS_COUNT: &str = "views_count";
    /// Comments counter column
    pub const COMMENTS_COUNT: &str = "comments_count";
    /// Reposts counter column
    pub const REPOSTS_COUNT: &str = "reposts_count";
}

/// Entities table schema
pub mod entities {
    /// Table name
    pub const TABLE: &str = "entities";
    /// Owning post column
    pub const POST_ID: &str = "post_id";
    /// Tag column
    pub const TYPE: &str = "type";
    /// Derived timestamp column
    pub const DATE: &str = "date";
    /// Normalized text column
    pub const ENTITY: &str = "entity";
}
