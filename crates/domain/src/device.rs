use uuid::Uuid;

/// Qbox locker as resolved from the device registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    id: Uuid,
    qbox_id: String,
    name: String,
    location: Option<String>,
    address: Option<String>,
}

impl Device {
    /// Creates a device record.
    #[must_use]
    pub fn new(
        id: Uuid,
        qbox_id: impl Into<String>,
        name: impl Into<String>,
        location: Option<String>,
        address: Option<String>,
    ) -> Self {
        Self {
            id,
            qbox_id: qbox_id.into(),
            name: name.into(),
            location,
            address,
        }
    }

    /// Returns the registry-internal identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the public device identifier (for example `QB-100`).
    #[must_use]
    pub fn qbox_id(&self) -> &str {
        self.qbox_id.as_str()
    }

    /// Returns the device display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the installation location, if recorded.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Returns the street address, if recorded.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}
