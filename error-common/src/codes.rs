// Error codes implementation
// Stable codes surfaced to the API layer alongside the error message

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const INVALID_TRANSITION: &str = "VALIDATION_1002";
}

pub mod lookup {
    pub const NOT_FOUND: &str = "LOOKUP_2001";
}

pub mod scheduling {
    pub const DOCTOR_UNAVAILABLE: &str = "SCHEDULING_5001";
    pub const CAPACITY_EXCEEDED: &str = "SCHEDULING_5002";
}

pub mod inventory {
    pub const INSUFFICIENT_STOCK: &str = "INVENTORY_6001";
}

pub mod database {
    pub const PERSISTENCE_FAILURE: &str = "DB_4002";
}
