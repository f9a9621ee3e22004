//! Fixed text sent to, and shown in place of, the analysis service.

/// Instruction sent verbatim with every image. Not user-editable.
///
/// The numbered headings and `- Label: value` lines it asks for are the
/// shapes [`crate::format::format`] turns into sections and fields, but the
/// formatter does not depend on the model obeying.
pub const LEAF_ANALYSIS_PROMPT: &str = r#"You are a botanist helping students learn about trees. Analyze the leaf in this image and provide the following information for educational purposes:

1. Species Identification:
   - Common name
   - Scientific name
   - Family
   - Confidence in the identification

2. Leaf Characteristics:
   - Shape, margin, venation and arrangement
   - Color and texture

3. Tree Characteristics:
   - Typical height and growth habit
   - Bark, flowers and fruit

4. Habitat and Distribution:
   - Native range
   - Preferred climate and soil

5. Uses and Ecological Importance:
   - Human uses
   - Value to wildlife and the ecosystem

Use the numbered headings above. Write each detail on its own line starting with "- ", in the form "- Label: value" where a label applies."#;

/// Analysis shown with the bootstrap image before any upload.
pub const DEFAULT_ANALYSIS: &str = r#"1. Species Identification:
- Common name: Red maple
- Scientific name: Acer rubrum
- Family: Sapindaceae
- Confidence: High, based on the three-lobed shape and serrated margin

2. Leaf Characteristics:
- Shape: Palmate with three to five shallow lobes
- Margin: Irregularly serrated
- Venation: Palmate, with veins radiating from the petiole
- Arrangement: Opposite
- Color: Green above, pale and slightly hairy below; brilliant red in autumn

3. Tree Characteristics:
- Height: 12 to 27 meters at maturity
- Bark: Smooth and light gray when young, darkening and furrowing with age
- Flowers: Small red clusters appearing in early spring before the leaves
- Fruit: Paired red samaras

4. Habitat and Distribution:
- Native range: Eastern and central North America
- Habitat: Swamps, floodplains, and dry upland ridges alike
- Soil: Tolerates a wide range, from wet to dry and acidic

5. Uses and Ecological Importance:
- Ornamental landscaping, shade tree
- Syrup production, though with lower sugar content than sugar maple
- Early spring pollen and nectar source for bees
- Browse for deer and seeds for birds and squirrels

Red maple is one of the most abundant and widespread trees in eastern North America."#;
