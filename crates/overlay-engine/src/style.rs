use doc_model::Category;
use image::Rgba;
use serde::Serialize;

/// Fixed drawing attributes of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStyle {
    pub color: [u8; 3],
    pub stroke_width: u32,
    /// Alpha of the translucent fill; zero means outline only.
    pub fill_alpha: u8,
    pub display_name: &'static str,
}

impl CategoryStyle {
    pub fn hex(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{r:02X}{g:02X}{b:02X}")
    }

    pub fn stroke(&self) -> Rgba<u8> {
        let [r, g, b] = self.color;
        Rgba([r, g, b, 255])
    }

    pub fn fill(&self) -> Option<Rgba<u8>> {
        let [r, g, b] = self.color;
        (self.fill_alpha > 0).then_some(Rgba([r, g, b, self.fill_alpha]))
    }
}

pub const fn style(category: Category) -> CategoryStyle {
    match category {
        Category::TextLine => CategoryStyle {
            color: [0x00, 0x7A, 0xCC],
            stroke_width: 2,
            fill_alpha: 0,
            display_name: "Text Lines",
        },
        Category::Paragraph => CategoryStyle {
            color: [0x99, 0x32, 0xCC],
            stroke_width: 2,
            fill_alpha: 0,
            display_name: "Paragraphs",
        },
        Category::Table => CategoryStyle {
            color: [0x00, 0xB0, 0x4F],
            stroke_width: 3,
            fill_alpha: 30,
            display_name: "Tables",
        },
        Category::FormField => CategoryStyle {
            color: [0xFF, 0x8C, 0x00],
            stroke_width: 2,
            fill_alpha: 0,
            display_name: "Form Fields (KVPs)",
        },
        Category::Entity => CategoryStyle {
            color: [0xDC, 0x14, 0x3C],
            stroke_width: 2,
            fill_alpha: 30,
            display_name: "Entities",
        },
        Category::Checkbox => CategoryStyle {
            color: [0x8A, 0x2B, 0xE2],
            stroke_width: 2,
            fill_alpha: 0,
            display_name: "Checkboxes",
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub category: Category,
    pub name: &'static str,
    pub color: String,
}

/// Categories in draw order with the colors the overlay uses for them.
pub fn legend() -> Vec<LegendEntry> {
    Category::DRAW_ORDER
        .into_iter()
        .map(|category| {
            let style = style(category);
            LegendEntry { category, name: style.display_name, color: style.hex() }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_follows_draw_order() {
        let legend = legend();
        let categories: Vec<Category> = legend.iter().map(|entry| entry.category).collect();

        assert_eq!(categories, Category::DRAW_ORDER.to_vec());
        assert_eq!(legend[0].color, "#007ACC");
        assert_eq!(legend[5].color, "#8A2BE2");
    }

    #[test]
    fn only_tables_and_entities_are_filled() {
        let filled: Vec<Category> = Category::DRAW_ORDER
            .into_iter()
            .filter(|category| style(*category).fill().is_some())
            .collect();

        assert_eq!(filled, vec![Category::Table, Category::Entity]);
        assert_eq!(style(Category::Table).stroke_width, 3);
    }
}
