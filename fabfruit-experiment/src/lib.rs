pub mod assign;
pub mod balance;
pub mod config;
pub mod design;
pub mod devalue;
pub mod error;
pub mod seed;
pub mod session;
pub mod survey;
pub mod timeline;
pub mod timing_file;

pub use assign::{BOX_FILE, assign_boxes, load_box_assignment, resume_boxes, save_box_assignment};
pub use balance::{BalanceRules, RunCounts, timeline_balanced};
pub use config::{PhaseEntry, PhasePlan, PhaseSettings};
pub use design::{Design, extract_devalued};
pub use devalue::{DevaluationDraw, devalued_blocks};
pub use error::{DesignError, Result};
pub use seed::{SEED_FILE, pick_seed, seed_for_dir};
pub use session::{Labels, Presenter, Response, ScoredTrial, SessionRunner, SurveyKeys};
pub use survey::{SurveyAnswer, SurveyItem, survey_items};
pub use timeline::{box_names, build_phase, build_plan};
pub use timing_file::{read_timing_files, select_runs, write_timing};
