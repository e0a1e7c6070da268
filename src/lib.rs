pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod storage;

pub mod models {
    pub mod mailbox;
    pub mod message;
}

pub mod repositories {
    pub mod mailbox;
    pub mod message;
}

pub mod services {
    pub mod ingest;
    pub mod lifecycle;
    pub mod mailbox;
    pub mod version;
}

pub mod handlers {
    pub mod ingest;
    pub mod mailbox;
    pub mod version;
}

pub mod validation {
    pub mod mailbox;
}
