//! Runnable demo bots live under `examples/`:
//!
//! - `echo_bot` — reply with the received text.
//! - `sum_bot` — `/sum 2 3` answers `5` via validated command arguments.
//! - `survey_bot` — a two-turn conversation through the waiter machine.
//!
//! Each needs `BOT_TOKEN` in the environment or a project `.env`.
