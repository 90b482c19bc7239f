use mailprobe_core::base_url::check_fixtures;

use crate::exit_codes::{CHECK_FAILED, SUCCESS};

pub fn run() -> anyhow::Result<i32> {
    let results = check_fixtures();
    let mut failed = 0;

    for r in &results {
        if r.passed() {
            println!("PASS {:?} + {:?} -> {}", r.fixture.base, r.fixture.path, r.actual);
        } else {
            failed += 1;
            println!(
                "FAIL {:?} + {:?} -> {} (expected {})",
                r.fixture.base, r.fixture.path, r.actual, r.fixture.expected
            );
        }
    }
    println!("{} fixtures, {} failed", results.len(), failed);

    Ok(if failed == 0 { SUCCESS } else { CHECK_FAILED })
}
