use flowgate_model::operation::OperationKind;
use flowgate_model::usage::UsageDelta;

const PAGE_FLOOR: u64 = 1;
const PAGE_CEILING: u64 = 1_000;

/// Caller-supplied hints for the quota-probe estimate. Anything `None` falls
/// back to the size-to-pages heuristic.
#[derive(Clone, Copy, Debug, Default)]
pub struct EstimationHint {
    pub declared_bytes: u64,
    pub declared_pages: Option<u64>,
}

/// Produces the estimated `UsageDelta` fed into `UsageLedger::check`.
/// Over-estimation is preferred; the usage tracker corrects with
/// actuals once the job completes.
pub fn estimate_delta(kind: OperationKind, hint: EstimationHint) -> UsageDelta {
    let pages = match hint.declared_pages {
        Some(declared) => declared,
        None => heuristic_pages(kind, hint.declared_bytes),
    }
    .clamp(PAGE_FLOOR, PAGE_CEILING);

    let ai_pages = if matches!(kind, OperationKind::AiOcr) {
        pages
    } else {
        0
    };

    UsageDelta::new(1, hint.declared_bytes, pages, ai_pages)
}

fn heuristic_pages(kind: OperationKind, bytes: u64) -> u64 {
    let per_page = kind.bytes_per_page_heuristic();
    if bytes == 0 {
        return PAGE_FLOOR;
    }
    bytes.div_ceil(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_declared_pages_when_present() {
        let delta = estimate_delta(
            OperationKind::Pdf,
            EstimationHint {
                declared_bytes: 1,
                declared_pages: Some(42),
            },
        );
        assert_eq!(delta.pages, 42);
    }

    #[test]
    fn falls_back_to_heuristic_and_floors_at_one() {
        let delta = estimate_delta(
            OperationKind::Pdf,
            EstimationHint {
                declared_bytes: 0,
                declared_pages: None,
            },
        );
        assert_eq!(delta.pages, 1);
    }

    #[test]
    fn caps_at_one_thousand_pages() {
        let delta = estimate_delta(
            OperationKind::Pdf,
            EstimationHint {
                declared_bytes: 1,
                declared_pages: Some(5_000),
            },
        );
        assert_eq!(delta.pages, 1_000);
    }

    #[test]
    fn only_ai_ocr_counts_ai_pages() {
        let delta = estimate_delta(
            OperationKind::AiOcr,
            EstimationHint {
                declared_bytes: 1,
                declared_pages: Some(3),
            },
        );
        assert_eq!(delta.ai_pages, 3);

        let delta = estimate_delta(
            OperationKind::Ocr,
            EstimationHint {
                declared_bytes: 1,
                declared_pages: Some(3),
            },
        );
        assert_eq!(delta.ai_pages, 0);
    }
}
