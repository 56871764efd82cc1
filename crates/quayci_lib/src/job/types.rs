use indexmap::IndexMap;

/// One scheduled check run, produced by the gateway once an event has
/// passed filtering.
#[derive(Debug, Clone)]
pub struct Job {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub actor: String,
}

impl Job {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

pub type JobSender = flume::Sender<Job>;
pub type JobReceiver = flume::Receiver<Job>;

/// Everything the check runner captured: step name -> combined output, in
/// execution order, plus the overall verdict. The map always carries
/// `metadata` and `setup`, even when a run dies in its first stage.
#[derive(Debug)]
pub struct CheckRunOutput {
    pub steps: IndexMap<String, String>,
    pub success: bool,
}
