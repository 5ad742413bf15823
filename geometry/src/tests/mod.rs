mod bounds;
mod vector;
