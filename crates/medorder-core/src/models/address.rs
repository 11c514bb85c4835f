//! Postal address carried by leads and orders.

use serde::{Deserialize, Serialize};

use super::Patch;

/// Free-text postal address (up to six lines) plus normalized pincode/city.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub address_line3: Option<String>,
    pub address_line4: Option<String>,
    pub address_line5: Option<String>,
    pub address_line6: Option<String>,
    pub pincode: Option<String>,
    pub city: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.lines().is_empty() && self.pincode.is_none() && self.city.is_none()
    }

    /// Non-empty address lines in order.
    pub fn lines(&self) -> Vec<&str> {
        [
            &self.address_line1,
            &self.address_line2,
            &self.address_line3,
            &self.address_line4,
            &self.address_line5,
            &self.address_line6,
        ]
        .into_iter()
        .filter_map(|line| line.as_deref())
        .filter(|line| !line.trim().is_empty())
        .collect()
    }
}

/// Partial update of an [`Address`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_line1: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_line2: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_line3: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_line4: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_line5: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_line6: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub pincode: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub city: Patch<String>,
}

impl AddressPatch {
    pub fn apply_to(self, address: &mut Address) {
        self.address_line1.apply_to(&mut address.address_line1);
        self.address_line2.apply_to(&mut address.address_line2);
        self.address_line3.apply_to(&mut address.address_line3);
        self.address_line4.apply_to(&mut address.address_line4);
        self.address_line5.apply_to(&mut address.address_line5);
        self.address_line6.apply_to(&mut address.address_line6);
        self.pincode.apply_to(&mut address.pincode);
        self.city.apply_to(&mut address.city);
    }
}
