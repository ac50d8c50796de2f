pub mod prescriptions;

pub use prescriptions::PrescriptionService;
