// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for the two workflows:
//
//   train_use_case    — dataset folder → trained checkpoint
//   inference_service — checkpoint → per-request predictions
//
// No tensor math and no printing here: the ml layer computes
// and the cli layer presents.

pub mod train_use_case;

pub mod inference_service;
