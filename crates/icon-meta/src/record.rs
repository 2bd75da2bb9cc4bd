use icon_types::{IconDescriptor, IconFileKey, IconName};

/// The metadata row of one icon: its name and the files it has.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconRecord {
    pub name: IconName,
    /// File keys in insertion order. Never empty for a stored icon.
    pub files: Vec<IconFileKey>,
}

impl IconRecord {
    pub fn has_file(&self, key: &IconFileKey) -> bool {
        self.files.contains(key)
    }

    pub fn descriptor(&self) -> IconDescriptor {
        IconDescriptor::new(&self.name, &self.files)
    }
}

/// What a successful `delete_file` removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileRemoval {
    /// Only the file row; the icon still has other files.
    FileRemoved,
    /// The file was the icon's last, so the icon row went with it.
    IconRemoved,
}
