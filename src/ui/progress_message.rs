/// Events the engine emits while a run is in progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressMessage {
    Started {
        total: usize,
        pending: usize,
        resume_from: usize,
    },
    Executing {
        index: usize,
        preview: String,
    },
    Committed {
        index: usize,
    },
    Failed {
        index: usize,
    },
    Finished,
}
