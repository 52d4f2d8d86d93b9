//! Fetch failure taxonomy and per-kind accounting.
//!
//! Fetch failures are data, not exceptions: the fetcher converts every network
//! or HTTP problem into a [`FetchFailure`] value that travels through the
//! pipeline alongside successful page records. `FetchStats` keeps atomic
//! per-kind counters so the end-of-run summary can break failures down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::SetLoggerError;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    Logger(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The kind of a fetch failure.
///
/// `Http` carries the status so the aggregator can distinguish a 404 broken
/// link from a 503 outage. All other variants are transport-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FetchFailureKind {
    /// Hostname did not resolve.
    Dns,
    /// TCP connection could not be established in time.
    ConnectTimeout,
    /// Connection established but the response did not arrive in time.
    ReadTimeout,
    /// TLS handshake or certificate failure.
    Tls,
    /// Redirect chain exceeded the hop bound.
    TooManyRedirects,
    /// Server answered with a 4xx/5xx status.
    Http { status: u16 },
    /// Anything that does not fit the categories above.
    Other,
}

/// A failed fetch, attached to the URL it was issued for.
///
/// Never aborts the run; the frontier records it and the aggregator turns
/// failed internal link targets into BROKEN_LINK findings.
#[derive(Error, Debug, Clone, Serialize)]
#[error("fetch of {url} failed: {detail}")]
pub struct FetchFailure {
    /// The URL the request was issued for (normalized form).
    pub url: String,
    /// Failure category.
    pub kind: FetchFailureKind,
    /// Human-readable description of the underlying error.
    pub detail: String,
    /// Redirect hops that were followed before the failure, if any.
    pub redirect_chain: Vec<String>,
}

impl FetchFailure {
    pub fn new(url: impl Into<String>, kind: FetchFailureKind, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            detail: detail.into(),
            redirect_chain: Vec::new(),
        }
    }

    /// HTTP status carried by this failure, if it was an HTTP-level failure.
    pub fn http_status(&self) -> Option<u16> {
        match self.kind {
            FetchFailureKind::Http { status } => Some(status),
            _ => None,
        }
    }

    /// Whether a retry with a longer timeout has a chance of succeeding.
    ///
    /// Timeouts, connection failures and 5xx responses are transient; 4xx
    /// responses, TLS problems and redirect loops are permanent.
    pub fn is_retriable(&self) -> bool {
        match self.kind {
            FetchFailureKind::ConnectTimeout
            | FetchFailureKind::ReadTimeout
            | FetchFailureKind::Dns => true,
            FetchFailureKind::Http { status } => (500..600).contains(&status) || status == 429,
            FetchFailureKind::Tls
            | FetchFailureKind::TooManyRedirects
            | FetchFailureKind::Other => false,
        }
    }
}

/// Statistics bucket for [`FetchStats`].
///
/// A flattened version of [`FetchFailureKind`]: HTTP failures collapse into
/// client/server buckets so the counter table stays fixed-size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureBucket {
    Dns,
    ConnectTimeout,
    ReadTimeout,
    Tls,
    TooManyRedirects,
    HttpClientError,
    HttpServerError,
    Other,
}

impl FailureBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureBucket::Dns => "DNS resolution failure",
            FailureBucket::ConnectTimeout => "connect timeout",
            FailureBucket::ReadTimeout => "read timeout",
            FailureBucket::Tls => "TLS error",
            FailureBucket::TooManyRedirects => "too many redirects",
            FailureBucket::HttpClientError => "HTTP 4xx",
            FailureBucket::HttpServerError => "HTTP 5xx",
            FailureBucket::Other => "other",
        }
    }
}

impl From<FetchFailureKind> for FailureBucket {
    fn from(kind: FetchFailureKind) -> Self {
        match kind {
            FetchFailureKind::Dns => FailureBucket::Dns,
            FetchFailureKind::ConnectTimeout => FailureBucket::ConnectTimeout,
            FetchFailureKind::ReadTimeout => FailureBucket::ReadTimeout,
            FetchFailureKind::Tls => FailureBucket::Tls,
            FetchFailureKind::TooManyRedirects => FailureBucket::TooManyRedirects,
            FetchFailureKind::Http { status } if status < 500 => FailureBucket::HttpClientError,
            FetchFailureKind::Http { .. } => FailureBucket::HttpServerError,
            FetchFailureKind::Other => FailureBucket::Other,
        }
    }
}

/// Thread-safe fetch failure counters.
///
/// All buckets are initialized to zero on creation, so increments never
/// allocate and the struct can be shared across tasks behind an `Arc`.
pub struct FetchStats {
    counts: HashMap<FailureBucket, AtomicUsize>,
}

impl FetchStats {
    pub fn new() -> Self {
        let mut counts = HashMap::new();
        for bucket in FailureBucket::iter() {
            counts.insert(bucket, AtomicUsize::new(0));
        }
        FetchStats { counts }
    }

    pub fn record(&self, kind: FetchFailureKind) {
        // All buckets are initialized in new(), so the lookup cannot miss.
        self.counts
            .get(&FailureBucket::from(kind))
            .unwrap()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, bucket: FailureBucket) -> usize {
        self.counts.get(&bucket).unwrap().load(Ordering::SeqCst)
    }

    /// Logs a one-line-per-bucket failure breakdown, skipping empty buckets.
    pub fn log_summary(&self) {
        for bucket in FailureBucket::iter() {
            let count = self.count(bucket);
            if count > 0 {
                log::info!("fetch failures: {} x {}", count, bucket.as_str());
            }
        }
    }
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a `reqwest::Error` into a [`FetchFailureKind`].
///
/// Status-bearing errors map to `Http`; otherwise the transport-level
/// predicates on `reqwest::Error` decide the kind. DNS failures surface from
/// reqwest as connect errors whose source mentions resolution, so the error
/// chain text is consulted as a fallback.
pub fn classify_reqwest_error(error: &reqwest::Error) -> FetchFailureKind {
    if let Some(status) = error.status() {
        return FetchFailureKind::Http {
            status: status.as_u16(),
        };
    }

    let chain_text = {
        use std::error::Error as _;
        let mut text = error.to_string().to_lowercase();
        let mut source = error.source();
        while let Some(cause) = source {
            text.push(' ');
            text.push_str(&cause.to_string().to_lowercase());
            source = cause.source();
        }
        text
    };

    if chain_text.contains("dns") || chain_text.contains("resolve") {
        FetchFailureKind::Dns
    } else if chain_text.contains("certificate")
        || chain_text.contains("tls")
        || chain_text.contains("handshake")
    {
        FetchFailureKind::Tls
    } else if error.is_timeout() {
        FetchFailureKind::ReadTimeout
    } else if error.is_connect() {
        FetchFailureKind::ConnectTimeout
    } else if error.is_redirect() {
        FetchFailureKind::TooManyRedirects
    } else {
        FetchFailureKind::Other
    }
}
