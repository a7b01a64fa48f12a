/// Answer arbitration and the single-winner claim.
pub mod answer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Win notification broadcasts.
pub mod notification_service;
/// Pure arithmetic question generation.
pub mod question_generator;
/// Round lifecycle: activation, regeneration, recovery.
pub mod question_service;
/// Score ledger and high-score table maintenance.
pub mod score_service;
/// Topic feed relays bridging store change feeds into the hub.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
/// Player join and listing operations.
pub mod user_service;
