/// One normalized row of the aggregated table.
///
/// Every field besides `bench` and `run` is `None` when the log did not carry
/// it; `None` is written as an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricRecord {
    pub bench: String,
    /// Repetition index, starting at 1
    pub run: u32,
    pub num_queries: Option<String>,
    pub blowup_factor: Option<String>,
    pub grinding_factor: Option<String>,
    /// Trace build duration as printed, unit included
    pub trace_build: Option<String>,
    pub prove: Option<String>,
    pub verify: Option<String>,
    /// Proof size as `<value> <unit>`, e.g. `16.85 KiB`
    pub proof_size_readable: Option<String>,
    /// Exact proof size in bytes
    pub proof_size_bytes: Option<String>,
}

/// Protocol parameters echoed by the prover
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoedParameters {
    pub num_queries: Option<String>,
    pub blowup_factor: Option<String>,
    pub grinding_factor: Option<String>,
}

impl EchoedParameters {
    /// Record `name = value`; the first value seen for a name is kept
    pub fn observe(&mut self, name: &str, value: &str) {
        let slot = match name {
            "num_queries" => &mut self.num_queries,
            "blowup_factor" => &mut self.blowup_factor,
            "grinding_factor" => &mut self.grinding_factor,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
}

/// Fields carried by a `Done.` summary line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFields {
    pub trace_build: Option<String>,
    pub prove: Option<String>,
    pub verify: Option<String>,
    pub proof_size_readable: Option<String>,
    pub proof_size_bytes: Option<String>,
}

impl MetricRecord {
    pub fn new(bench: &str, run: u32, params: &EchoedParameters, summary: SummaryFields) -> Self {
        Self {
            bench: bench.to_string(),
            run,
            num_queries: params.num_queries.clone(),
            blowup_factor: params.blowup_factor.clone(),
            grinding_factor: params.grinding_factor.clone(),
            trace_build: summary.trace_build,
            prove: summary.prove,
            verify: summary.verify,
            proof_size_readable: summary.proof_size_readable,
            proof_size_bytes: summary.proof_size_bytes,
        }
    }
}
