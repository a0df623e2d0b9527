//! COCO class vocabulary.
//!
//! Used as the field set when counting detections per class. Model labels
//! outside the vocabulary are counted under [`CocoLabel::Other`].

use crate::metrics::MetricField;

macro_rules! coco_labels {
    ($($variant:ident => $name:literal, $label:literal;)+) => {
        /// Closed set of COCO object classes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CocoLabel {
            $($variant,)+
            /// Any label the vocabulary does not know.
            Other,
        }

        impl CocoLabel {
            /// All known classes, in COCO id order. `Other` is not included.
            pub const ALL: &'static [CocoLabel] = &[$(CocoLabel::$variant,)+];

            /// Model-facing label text (e.g. `"traffic light"`).
            pub fn as_label(self) -> &'static str {
                match self {
                    $(CocoLabel::$variant => $label,)+
                    CocoLabel::Other => "other",
                }
            }

            /// Parse a model label; unknown labels map to `Other`.
            pub fn from_label(label: &str) -> Self {
                match label {
                    $($label => CocoLabel::$variant,)+
                    _ => CocoLabel::Other,
                }
            }
        }

        impl MetricField for CocoLabel {
            fn name(&self) -> &'static str {
                match self {
                    $(CocoLabel::$variant => $name,)+
                    CocoLabel::Other => "other",
                }
            }
        }
    };
}

coco_labels! {
    Person => "person", "person";
    Bicycle => "bicycle", "bicycle";
    Car => "car", "car";
    Motorcycle => "motorcycle", "motorcycle";
    Airplane => "airplane", "airplane";
    Bus => "bus", "bus";
    Train => "train", "train";
    Truck => "truck", "truck";
    Boat => "boat", "boat";
    TrafficLight => "traffic_light", "traffic light";
    FireHydrant => "fire_hydrant", "fire hydrant";
    StopSign => "stop_sign", "stop sign";
    ParkingMeter => "parking_meter", "parking meter";
    Bench => "bench", "bench";
    Bird => "bird", "bird";
    Cat => "cat", "cat";
    Dog => "dog", "dog";
    Horse => "horse", "horse";
    Sheep => "sheep", "sheep";
    Cow => "cow", "cow";
    Elephant => "elephant", "elephant";
    Bear => "bear", "bear";
    Zebra => "zebra", "zebra";
    Giraffe => "giraffe", "giraffe";
    Backpack => "backpack", "backpack";
    Umbrella => "umbrella", "umbrella";
    Handbag => "handbag", "handbag";
    Tie => "tie", "tie";
    Suitcase => "suitcase", "suitcase";
    Frisbee => "frisbee", "frisbee";
    Skis => "skis", "skis";
    Snowboard => "snowboard", "snowboard";
    SportsBall => "sports_ball", "sports ball";
    Kite => "kite", "kite";
    BaseballBat => "baseball_bat", "baseball bat";
    BaseballGlove => "baseball_glove", "baseball glove";
    Skateboard => "skateboard", "skateboard";
    Surfboard => "surfboard", "surfboard";
    TennisRacket => "tennis_racket", "tennis racket";
    Bottle => "bottle", "bottle";
    WineGlass => "wine_glass", "wine glass";
    Cup => "cup", "cup";
    Fork => "fork", "fork";
    Knife => "knife", "knife";
    Spoon => "spoon", "spoon";
    Bowl => "bowl", "bowl";
    Banana => "banana", "banana";
    Apple => "apple", "apple";
    Sandwich => "sandwich", "sandwich";
    Orange => "orange", "orange";
    Broccoli => "broccoli", "broccoli";
    Carrot => "carrot", "carrot";
    HotDog => "hot_dog", "hot dog";
    Pizza => "pizza", "pizza";
    Donut => "donut", "donut";
    Cake => "cake", "cake";
    Chair => "chair", "chair";
    Couch => "couch", "couch";
    PottedPlant => "potted_plant", "potted plant";
    Bed => "bed", "bed";
    DiningTable => "dining_table", "dining table";
    Toilet => "toilet", "toilet";
    Tv => "tv", "tv";
    Laptop => "laptop", "laptop";
    Mouse => "mouse", "mouse";
    Remote => "remote", "remote";
    Keyboard => "keyboard", "keyboard";
    CellPhone => "cell_phone", "cell phone";
    Microwave => "microwave", "microwave";
    Oven => "oven", "oven";
    Toaster => "toaster", "toaster";
    Sink => "sink", "sink";
    Refrigerator => "refrigerator", "refrigerator";
    Book => "book", "book";
    Clock => "clock", "clock";
    Vase => "vase", "vase";
    Scissors => "scissors", "scissors";
    TeddyBear => "teddy_bear", "teddy bear";
    HairDrier => "hair_drier", "hair drier";
    Toothbrush => "toothbrush", "toothbrush";
}
