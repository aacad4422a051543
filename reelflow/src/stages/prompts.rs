//! Prompt text sent to the generation backend, one builder per zone.

/// Scene used by the composite zone when research left it empty.
pub const FALLBACK_COMPOSITE_SCENE: &str = "person presenting product";

/// Scene used by the video zone when research left it empty.
pub const FALLBACK_VIDEO_SCENE: &str = "cinematic product showcase";

/// Research prompt asking for the six-field metadata object.
#[must_use]
pub fn research_prompt(keyword: &str) -> String {
    format!(
        r#"You are a short-form video marketing expert.
Produce the following information for a promotional video about '{keyword}' as JSON:

{{
  "title": "catchy title (max 50 characters)",
  "description": "SEO-optimized description (max 200 characters)",
  "tags": ["tag1", "tag2", "tag3", "tag4", "tag5"],
  "trend_summary": "current trend summary for this product (max 100 characters)",
  "product_description": "detailed product description for the visuals (English, max 50 words)",
  "scene_description": "scene in which the product is shown (English, max 50 words)"
}}

Output valid JSON only."#
    )
}

/// Product photograph prompt.
#[must_use]
pub fn product_prompt(product_description: &str, style: &str) -> String {
    format!(
        "Generate a high-quality product photograph:
Product: {product_description}
Style: {style}
Requirements: Clean white/gradient background, studio lighting,
ultra-detailed, 4K quality, no text or watermarks."
    )
}

/// Composite prompt; the reference image is attached first, the product second.
#[must_use]
pub fn composite_prompt(scene: &str) -> String {
    format!(
        "Combine these two images into a natural, professional scene:
- The person/character from the first image should be holding or presenting the product from the second image.
- Scene: {scene}
- Style: Professional product advertisement, natural lighting, seamless composition.
- Make it look like a real photograph, not a collage."
    )
}

/// Image-to-video prompt for an 8-second vertical clip.
#[must_use]
pub fn video_prompt(scene: &str, camera_hint: &str) -> String {
    format!(
        "Create a cinematic 8-second product advertisement video.
Scene: {scene}
Camera: {camera_hint}
Style: Professional, smooth transitions, high production value.
The person should naturally interact with the product."
    )
}
