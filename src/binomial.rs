// This file is part of the wdl-tablebase library.
// Copyright (C) 2017-2024 Niklas Fiekas <niklas.fiekas@backscattering.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.


use once_cell::sync::Lazy;

/// Largest `n` served from the precomputed table.
const TABLE_N: usize = 64;

/// Pascal's triangle for `n <= 64`. Every entry fits into a `u64`.
static BINOMIALS: Lazy<Box<[[u64; TABLE_N + 1]; TABLE_N + 1]>> = Lazy::new(|| {
    let mut table = Box::new([[0; TABLE_N + 1]; TABLE_N + 1]);
    for n in 0..=TABLE_N {
        table[n][0] = 1;
        for k in 1..=n {
            table[n][k] = table[n - 1][k - 1] + table[n - 1][k];
        }
    }
    table
});

/// Number of ways to choose `k` out of `n` elements.
///
/// Returns `0` if `k > n`. Saturates at `u64::MAX` if the exact result does
/// not fit.
///
/// ```
/// use wdl_tablebase::binomial;
///
/// assert_eq!(binomial(4, 2), 6);
/// assert_eq!(binomial(10, 3), 120);
/// assert_eq!(binomial(3, 4), 0);
/// ```
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        0
    } else if n <= TABLE_N as u64 {
        BINOMIALS[n as usize][k as usize]
    } else {
        binomial_wide(n, k).unwrap_or(u64::MAX)
    }
}

/// Multiplicative formula, `None` on overflow.
const fn binomial_wide(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = if k > n - k { n - k } else { k };
    let mut r: u128 = 1;
    let mut i = 1;
    while i <= k {
        // Exact: r is C(n - k + i - 1, i - 1) before this step.
        r = r * (n - k + i) as u128 / i as u128;
        if r > u64::MAX as u128 {
            return None;
        }
        i += 1;
    }
    Some(r as u64)
}
