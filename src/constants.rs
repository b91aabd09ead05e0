//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// QUEUE DEFAULTS
// =============================================================================

/// Queue carrying judge requests (intake -> judge stage)
pub const DEFAULT_JUDGE_QUEUE: &str = "judge_queue";

/// Queue carrying judge results (judge stage -> result stage)
pub const DEFAULT_RESULT_QUEUE: &str = "result_queue";

/// Queue receiving messages that exhausted their retry budget
pub const DEFAULT_DEAD_LETTER_QUEUE: &str = "judge_dead_letter";

/// Consumer group shared by every worker instance
pub const DEFAULT_CONSUMER_GROUP: &str = "neptune";

/// How long a consumer blocks waiting for a message (milliseconds)
pub const DEFAULT_QUEUE_BLOCK_MS: u64 = 5000;

/// Default number of judge-stage consumers
pub const DEFAULT_JUDGE_WORKERS: usize = 2;

/// Default number of result-stage consumers
pub const DEFAULT_RESULT_WORKERS: usize = 1;

// =============================================================================
// RETRY DEFAULTS
// =============================================================================

/// Publish/handler attempts after the first failure before dead-lettering
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// Base delay for exponential backoff (milliseconds)
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;

/// Upper bound for a single backoff delay (milliseconds)
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

// =============================================================================
// EXECUTION DEFAULTS
// =============================================================================

/// Timeout for one call to the execution service (seconds)
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 30;

/// Remote execution status ids
pub mod execution_status {
    /// Program ran to completion
    pub const RAN_OK: i32 = 3;
    /// Remote comparison reported wrong output
    pub const WRONG_OUTPUT: i32 = 4;
    pub const TIME_LIMIT: i32 = 5;
    pub const COMPILE_ERROR: i32 = 6;
    /// First of the runtime-error variants (SIGSEGV, SIGXFSZ, SIGFPE, SIGABRT, NZEC, other)
    pub const RUNTIME_ERROR_FIRST: i32 = 7;
    pub const RUNTIME_ERROR_LAST: i32 = 12;
}

/// Marker line placed before stderr in a stored actual output
pub const STDERR_MARKER: &str = "\n--- STDERR ---\n";

/// Marker line placed before compiler output in a stored actual output
pub const COMPILE_OUTPUT_MARKER: &str = "\n--- COMPILE OUTPUT ---\n";

// =============================================================================
// STORAGE DEFAULTS
// =============================================================================

/// Directory receiving submitted source files
pub const DEFAULT_SUBMISSIONS_PATH: &str = "public/submissions";

/// Root that test-case file handles are resolved against
pub const DEFAULT_TEST_CASES_ROOT: &str = ".";

/// Base name of a stored source file
pub const SOURCE_FILE_STEM: &str = "main";

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Languages accepted by the execution service
pub mod languages {
    /// One entry of the language catalogue
    #[derive(Debug, Clone, Copy, serde::Serialize)]
    pub struct Language {
        pub id: i32,
        pub name: &'static str,
        #[serde(skip)]
        pub extension: &'static str,
    }

    pub const ALL: &[Language] = &[
        Language { id: 71, name: "Python (3.8.1)", extension: ".py" },
        Language { id: 76, name: "C++ (Clang 7.0.1)", extension: ".cpp" },
        Language { id: 52, name: "C++ (GCC 7.4.0)", extension: ".cpp" },
        Language { id: 53, name: "C++ (GCC 8.3.0)", extension: ".cpp" },
        Language { id: 54, name: "C++ (GCC 9.2.0)", extension: ".cpp" },
        Language { id: 75, name: "C (Clang 7.0.1)", extension: ".c" },
        Language { id: 48, name: "C (GCC 7.4.0)", extension: ".c" },
        Language { id: 49, name: "C (GCC 8.3.0)", extension: ".c" },
        Language { id: 50, name: "C (GCC 9.2.0)", extension: ".c" },
    ];

    /// Look up a language by its execution-service id
    pub fn find(id: i32) -> Option<&'static Language> {
        ALL.iter().find(|lang| lang.id == id)
    }

    /// Source file extension for a language id ("" when unknown)
    pub fn extension_for(id: i32) -> &'static str {
        find(id).map(|lang| lang.extension).unwrap_or("")
    }
}

// =============================================================================
// CONTEST SETTINGS
// =============================================================================

/// Penalty time for wrong submission in ICPC mode (in minutes)
pub const ICPC_PENALTY_MINUTES: i64 = 20;

/// Maximum score of a submission
pub const MAX_SCORE: i32 = 100;

// =============================================================================
// API VERSIONING
// =============================================================================

/// API base path
pub const API_BASE_PATH: &str = "/api/v1";

// =============================================================================
// LIVE STATUS
// =============================================================================

/// Capacity of a websocket listener's outbound buffer
pub const LISTENER_BUFFER: usize = 64;
