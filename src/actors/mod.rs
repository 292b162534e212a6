//! Actor-based ingestion pipeline
//!
//! Long-lived concerns run as independent async tasks communicating via
//! Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!            MQTT broker (tanks/+/sensor)
//!                         │
//!             ┌───────────▼────────────┐
//!             │  IngestionCoordinator  │  one task per inbound publish:
//!             │                        │  normalize → persist → evaluate
//!             └───┬────────┬────────┬──┘  → publish alerts → broadcast
//!                 │        │        │
//!       ┌─────────▼──┐ ┌───▼─────┐ ┌▼─────────────┐
//!       │ SinkWriter │ │Evaluator│ │ Broadcaster  │
//!       │ (bounded   │ │(shared, │ │ (live viewer │
//!       │  queue)    │ │ mutex)  │ │  fanout)     │
//!       └────────────┘ └─────────┘ └──────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the sink writer has an mpsc command channel; `try_send`
//!    keeps persistence fire-and-forget
//! 2. **Request/Response**: oneshot channels for stats queries
//! 3. **Shared state**: the evaluator and broadcaster are plain `Arc`
//!    components with internal locking, passed by handle to the coordinator

pub mod ingest;
pub mod messages;
pub mod sink;
