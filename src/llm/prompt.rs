/// System instruction sent with every listing request.
///
/// Defines the two-part output contract: a human-readable listing followed by
/// one JSON object at the end of the reply.
pub const LISTING_SYSTEM_PROMPT: &str = r##"Extract product details for e-commerce listing. 
Format a human-readable listing followed by a JSON block at the end.
Human Readable Format:
📦 [Product Name]  
💰 Price: ₹XX.XX  
✨ Key Features:  
• [Main Feature 1]  
• [Main Feature 2]  
• [Main Feature 3]  
🖼 [Product Image]  
🏷 Available Now on E-commerce Platform  
✈ Fast Shipping Available  
🛒 Shop Now: [Link]  
🔍 Search: [Main Keywords]  
[#RelevantHashtags]
(Optional if available)
🆔 License Number: [License No.]  
🏭 Manufacturing Date: [DD-MM-YYYY]  
⌛ Use By: [DD-MM-YYYY]  
🍽 Nutrition Information:  
• [Nutrient 1: Value]  
• [Nutrient 2: Value]  
• [Nutrient 3: Value]
JSON Format:
{
  "product_name": "...",
  "price": "...",
  "features": ["...", "...", "..."],
  "image": "...",
  "available": true,
  "shipping": "Fast",
  "shop_link": "...",
  "keywords": "...",
  "hashtags": ["#tag1", "#tag2"],
  "license_number": "...",
  "manufacture_date": "...",
  "use_by": "...",
  "nutrition_info": {
    "Nutrient 1": "...",
    "Nutrient 2": "...",
    "Nutrient 3": "..."
  }
}
"##;
