//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Deterministic test vectors for the tbenc/v1 format.
//!
//! Fix all randomness (key, nonce prefix) so the ciphertext layout is
//! identical on every run, pinning the wire format against accidental
//! changes. Cross-implementation conformance checks use the same inputs.
