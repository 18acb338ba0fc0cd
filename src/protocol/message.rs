//! Request messages
//!
//! Client-to-server message bodies, one struct per opcode.

use crate::bson::Document;

use super::OpCode;

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident { $( $(#[$fmeta:meta])* $flag:ident = $bit:expr ),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(pub i32);

        impl $name {
            $( $(#[$fmeta])* pub const $flag: $name = $name($bit); )*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub const fn bits(self) -> i32 {
                self.0
            }

            pub const fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

flag_set! {
    /// Query option bits
    QueryFlags {
        TAILABLE_CURSOR = 1 << 1,
        /// Allow a non-primary to answer
        SLAVE_OK = 1 << 2,
        NO_CURSOR_TIMEOUT = 1 << 4,
    }
}

flag_set! {
    /// Update option bits
    UpdateFlags {
        /// Insert the update document if nothing matches
        UPSERT = 1 << 0,
        /// Update every match instead of the first
        MULTI = 1 << 1,
    }
}

flag_set! {
    /// Delete option bits
    DeleteFlags {
        SINGLE_REMOVE = 1 << 0,
    }
}

/// Insert one or more documents
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub flags: i32,
    pub namespace: String,
    pub documents: Vec<Document>,
}

impl Insert {
    pub fn new(namespace: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            flags: 0,
            namespace: namespace.into(),
            documents,
        }
    }
}

/// Update documents matching a selector
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub namespace: String,
    pub flags: UpdateFlags,
    pub selector: Document,
    pub update: Document,
}

impl Update {
    pub fn new(
        namespace: impl Into<String>,
        selector: Document,
        update: Document,
        flags: UpdateFlags,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            flags,
            selector,
            update,
        }
    }
}

/// Delete documents matching a selector
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub namespace: String,
    pub flags: DeleteFlags,
    pub selector: Document,
}

impl Delete {
    pub fn new(namespace: impl Into<String>, selector: Document) -> Self {
        Self {
            namespace: namespace.into(),
            flags: DeleteFlags::empty(),
            selector,
        }
    }
}

/// Open a cursor over documents matching `query`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub flags: QueryFlags,
    pub namespace: String,
    pub number_to_skip: i32,
    /// 0 = server default, negative = hard limit and close after one batch
    pub number_to_return: i32,
    pub query: Document,
    pub fields: Option<Document>,
}

impl Query {
    pub fn new(namespace: impl Into<String>, query: Document) -> Self {
        Self {
            flags: QueryFlags::empty(),
            namespace: namespace.into(),
            number_to_skip: 0,
            number_to_return: 0,
            query,
            fields: None,
        }
    }

    pub fn skip(mut self, skip: i32) -> Self {
        self.number_to_skip = skip;
        self
    }

    pub fn number_to_return(mut self, n: i32) -> Self {
        self.number_to_return = n;
        self
    }

    pub fn fields(mut self, fields: Option<Document>) -> Self {
        self.fields = fields;
        self
    }

    pub fn flags(mut self, flags: QueryFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Fetch the next batch of an open cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMore {
    pub namespace: String,
    pub number_to_return: i32,
    pub cursor_id: i64,
}

impl GetMore {
    pub fn new(namespace: impl Into<String>, number_to_return: i32, cursor_id: i64) -> Self {
        Self {
            namespace: namespace.into(),
            number_to_return,
            cursor_id,
        }
    }
}

/// Release server-side cursors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillCursors {
    pub cursor_ids: Vec<i64>,
}

impl KillCursors {
    pub fn new(cursor_ids: Vec<i64>) -> Self {
        Self { cursor_ids }
    }
}

/// Any client-originated message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Query(Query),
    GetMore(GetMore),
    KillCursors(KillCursors),
}

impl Message {
    pub fn op_code(&self) -> OpCode {
        match self {
            Message::Insert(_) => OpCode::Insert,
            Message::Update(_) => OpCode::Update,
            Message::Delete(_) => OpCode::Delete,
            Message::Query(_) => OpCode::Query,
            Message::GetMore(_) => OpCode::GetMore,
            Message::KillCursors(_) => OpCode::KillCursors,
        }
    }

    /// Whether the server answers this message with a Reply
    pub fn expects_reply(&self) -> bool {
        matches!(self, Message::Query(_) | Message::GetMore(_))
    }

    /// Writes mutate data and must never be replayed against another server
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Message::Insert(_) | Message::Update(_) | Message::Delete(_)
        )
    }
}

macro_rules! into_message {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Message {
                fn from(m: $variant) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

into_message!(Insert, Update, Delete, Query, GetMore, KillCursors);
