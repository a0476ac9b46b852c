/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Section {
    Text,
    Data,
}

// One section's word array plus the offset of the last label placed in it.
// A label placed at the very end of a section needs a real word to point at,
// so finalization appends a zero sentinel when last_label_offset == len.
#[derive(Debug, Default)]
pub struct SectionData {
    pub words: Vec<u16>,
    pub last_label_offset: Option<usize>,
}

impl SectionData {
    pub fn push(&mut self, word: u16) {
        self.words.push(word);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn mark_label(&mut self) {
        self.last_label_offset = Some(self.words.len());
    }

    pub fn needs_sentinel(&self) -> bool {
        self.last_label_offset == Some(self.words.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_when_label_at_end() {
        let mut section = SectionData::default();
        section.push(0x1234);
        section.mark_label();
        assert!(section.needs_sentinel());
        section.push(0);
        assert!(!section.needs_sentinel());
    }

    #[test]
    fn test_no_sentinel_without_labels() {
        let mut section = SectionData::default();
        section.push(0x1234);
        assert!(!section.needs_sentinel());
    }
}
